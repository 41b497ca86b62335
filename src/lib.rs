pub mod config;
pub mod error;
pub mod filter;
pub mod convert;
pub mod notifier;
pub mod watch;

pub use config::Config;
pub use convert::convert;
pub use error::{ConvertError, NotifyError, Result, WebpwatchError};
pub use filter::{is_convertible, output_path_for};
