use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use serde_json::json;

use meditrack_anomaly::io::lab_results::read_lab_results;
use meditrack_anomaly::{AnomalyDetectionService, EngineConfig, LabResult, ModelName};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(
            env_logger::Env::default().filter_or("MEDITRACK_LOG", "error,meditrack_anomaly=info"),
        )
        .init();

    let history_arg = Arg::new("history")
        .help("Historical lab results with abnormal flags (*.tsv or *.csv)")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath);
    let config_arg = Arg::new("config")
        .short('c')
        .long("config")
        .help("Path to a JSON engine configuration. Defaults are used when omitted.")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath);

    let matches = Command::new("meditrack-anomaly")
        .version(clap::crate_version!())
        .about("Ensemble anomaly detection for laboratory results")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train the ensemble and report per-model test metrics")
                .arg(history_arg.clone())
                .arg(config_arg.clone())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Write the training report as JSON to this file instead of stdout")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Train on history, then classify every result of an input file")
                .arg(history_arg)
                .arg(
                    Arg::new("input")
                        .help("Lab results to classify (*.tsv or *.csv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(config_arg)
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .help("Use a single classifier instead of the ensemble vote")
                        .value_parser([
                            "knn",
                            "decisionTree",
                            "bayesian",
                            "svm",
                            "neuralNetwork",
                        ]),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Path to the prediction table (*.tsv or *.csv). Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .get_matches();

    let outcome = match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    };

    if let Err(e) = outcome {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(matches: &ArgMatches) -> Result<EngineConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("Using config: {:?}", path);
            EngineConfig::from_json_file(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn train_service(matches: &ArgMatches) -> Result<AnomalyDetectionService> {
    let config = load_config(matches)?;
    let history_path = required_path(matches, "history")?;
    let history = read_lab_results(history_path)?;
    log::info!(
        "Training on {} lab results from {:?}",
        history.len(),
        history_path
    );

    let mut service = AnomalyDetectionService::new(config);
    service.train(&history).context("Training failed")?;
    Ok(service)
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let service = train_service(matches)?;
    let report = json!({
        "comparison": service.model_comparison(),
        "bestModel": service.best_model(),
    });
    let text = serde_json::to_string_pretty(&report)?;

    match matches.get_one::<PathBuf>("output") {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write training report: {:?}", path))?;
            log::info!("Training report written to {:?}", path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let service = train_service(matches)?;
    let input = read_lab_results(required_path(matches, "input")?)?;
    let model = match matches.get_one::<String>("model") {
        Some(name) => Some(name.parse::<ModelName>()?),
        None => None,
    };

    let output = matches.get_one::<PathBuf>("output");
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {:?}", path)
        })?)),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(output_delimiter(output.map(PathBuf::as_path)))
        .from_writer(sink);

    write_predictions(&mut writer, &service, &input, model)?;
    writer.flush()?;
    log::info!("Classified {} lab results", input.len());
    Ok(())
}

fn write_predictions<W: Write>(
    writer: &mut csv::Writer<W>,
    service: &AnomalyDetectionService,
    input: &[LabResult],
    model: Option<ModelName>,
) -> Result<()> {
    writer.write_record([
        "result_id",
        "model",
        "is_anomalous",
        "confidence",
        "votes_for_anomalous",
        "total_models",
        "error",
    ])?;

    for (idx, result) in input.iter().enumerate() {
        let id = result
            .id
            .clone()
            .unwrap_or_else(|| format!("row_{}", idx + 1));
        let params = &result.parameter_results;

        let row = match model {
            Some(name) => service
                .predict_single(params, name.as_str())
                .map(|p| {
                    [
                        name.to_string(),
                        p.is_abnormal().to_string(),
                        format!("{:.4}", p.confidence),
                        String::new(),
                        String::new(),
                    ]
                }),
            None => service.predict_ensemble(params).map(|r| {
                [
                    "ensemble".to_string(),
                    r.is_anomalous.to_string(),
                    format!("{:.4}", r.ensemble.confidence),
                    r.ensemble.votes_for_anomalous.to_string(),
                    r.ensemble.total_models.to_string(),
                ]
            }),
        };

        match row {
            Ok([label, flag, confidence, votes, total]) => {
                writer.write_record([id, label, flag, confidence, votes, total, String::new()])?
            }
            Err(e) => {
                log::warn!("Could not classify {}: {}", id, e);
                let blank = String::new;
                writer.write_record([id, blank(), blank(), blank(), blank(), blank(), e.to_string()])?
            }
        }
    }
    Ok(())
}

fn required_path<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    matches
        .get_one::<PathBuf>(name)
        .with_context(|| format!("Missing required argument <{}>", name))
}

fn output_delimiter(path: Option<&Path>) -> u8 {
    match path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}
