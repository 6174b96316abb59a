use log::LevelFilter;

pub struct Logger;

impl Logger {
    /// Installs the global colog logger at the requested verbosity.
    pub fn init(verbosity: LevelFilter) {
        colog::basic_builder().filter_level(verbosity).init();
    }
}
