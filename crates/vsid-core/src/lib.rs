pub mod document;
pub mod engine;
pub mod error;
pub mod geofence;
pub mod models;
pub mod ordered;
pub mod performance;
pub mod settings;

pub use document::{AirportConfig, AreaDefinition, CustomOverride, NameSet, OverrideDocument, SidVariant};
pub use engine::{assign, fetch_cfl, AirportContext, EngineOutput};
pub use error::{AssignError, ConfigError, DocumentError, ErrorKind};
pub use models::{
    ActiveAirport, Area, Assignment, FlightRules, FlightSnapshot, GroundStatus, Pilot, Request,
    Route, Rule, CHECK_FP, NO_SID,
};
pub use ordered::OrderedMap;
pub use performance::{AircraftProfile, PerformanceTable};
pub use settings::{ColorName, Palette, Rgb, Settings, SettingsFault};
