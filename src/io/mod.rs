pub mod lab_results;
