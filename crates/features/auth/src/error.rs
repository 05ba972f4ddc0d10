use std::borrow::Cow;

#[modhub_derive::modhub_error]
pub enum AuthError {
    #[error("Invalid credentials{}: {message}", format_context(.context))]
    InvalidCredentials { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("No active session{}", format_context(.context))]
    NotSignedIn { context: Option<Cow<'static, str>> },

    #[error("Internal auth error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
