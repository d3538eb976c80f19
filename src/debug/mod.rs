//! Operator debug surface: a console command language and the same
//! callables over HTTP.

pub mod command;
pub mod console;
pub mod routes;

pub use command::{CommandParser, ConsoleCommand};
pub use console::{ConsoleReply, DebugConsole, DiagnoseAndExport, DiagnosticReport};
pub use routes::debug_routes;
