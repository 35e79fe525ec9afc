mod principal;

pub use principal::require_principal;
