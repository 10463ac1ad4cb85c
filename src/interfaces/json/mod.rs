pub mod replayer;
pub mod scenario_reader;
