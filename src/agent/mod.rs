//! Conversational core: routing, sessions, validation and dispatch.

pub mod dispatcher;
pub mod intent;
pub mod prompts;
pub mod router;
pub mod session;
pub mod validator;

pub use dispatcher::{ChatTurnRequest, GraphDispatcher};
pub use intent::{CollectionInfo, Envelope, NftInfo, Recipient, TransferIntent};
pub use router::{IntentClassifier, Mode, Route};
pub use session::{Phase, Session, SessionKey, SessionPatch, SessionSnapshot, SessionStore};
pub use validator::{ParsedReply, ResponseValidator, finalize_nft, parse_reply};
