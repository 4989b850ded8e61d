mod io_utils;
mod math;

pub use io_utils::open_sequence_reader;
pub use math::median;

pub type Result<T> = std::result::Result<T, String>;

pub fn handle_error_and_exit(err: String) -> ! {
    log::error!("{}", err);
    std::process::exit(1);
}
