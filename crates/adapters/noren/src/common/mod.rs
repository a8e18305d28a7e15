//! Types shared by the Noren REST and WebSocket clients.

pub mod consts;
pub mod credential;
pub mod enums;
pub mod parse;
pub mod session;
pub mod urls;

pub use consts::*;
pub use credential::*;
pub use enums::*;
pub use parse::*;
pub use session::*;
pub use urls::*;
