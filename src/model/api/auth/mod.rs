mod request;

pub use request::{
    normalise_email, AccountView, LoginRequest, RegisterRequest, RegistrationError,
    MIN_PASSWORD_LENGTH,
};
