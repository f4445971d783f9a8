mod token;
mod token_request;

pub use token::{Token, TOKEN_LIFETIME};
pub use token_request::{request_token, TokenRequest, TokenScope, TOKEN_ENDPOINT_PATH};
