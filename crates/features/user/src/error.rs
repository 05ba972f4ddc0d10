use std::borrow::Cow;

#[modhub_derive::modhub_error]
pub enum UserError {
    #[error("User error{}: {source}", format_context(.context))]
    Auth { source: modhub_auth::AuthError, context: Option<Cow<'static, str>> },

    #[error("Invalid display name{}: {message}", format_context(.context))]
    InvalidName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal user error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
