pub(crate) const DEFAULT_DATABASE_ID: &str = "(default)";

pub(crate) const DEFAULT_HOST: &str = "firestore.googleapis.com";

pub(crate) const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";
