mod connection;
mod session;
mod stream;

pub use session::{FtpClient, FtpConfig};
