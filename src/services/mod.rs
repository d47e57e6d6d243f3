pub mod profile_service;

pub use profile_service::{
    ProfileError, ProfileUpdateService, StalePolicy, UpdateOutcome, DEFAULT_MAX_ATTEMPTS,
};
