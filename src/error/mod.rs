mod switch;
mod switchyard;

pub use switch::SwitchError;
pub use switchyard::{ApiErrorBody, ApiErrorObject, SwitchyardError};
