//! Studio state: chat sessions, the streamed-code interpreter, and the
//! asset library, plus the round workers that tie them to a provider.

pub mod assets;
pub mod intent;
pub mod interpreter;
pub mod session;
pub mod studio;
