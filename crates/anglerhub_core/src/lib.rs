pub mod criteria;
pub mod domain;
pub mod geo;
pub mod ports;
pub mod progress;
pub mod query;
pub mod stats;
pub mod tracker;
pub mod units;
pub mod validation;
pub mod weather;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use criteria::GoalCriteria;
pub use domain::{
    Catch, CatchDetails, Goal, GoalDraft, GoalStatus, GoalType, NewUser, ProfileUpdate, User,
    UserCredentials, WeatherLog, WeatherReading,
};
pub use ports::{DatabaseService, PhotoStorage, PortError, PortResult};
pub use tracker::{ProgressTracker, RefreshSummary};
pub use units::UserPreferences;
pub use validation::ValidationErrors;
