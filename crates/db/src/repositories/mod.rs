pub mod eod_setting_repo;
pub mod species_toggle_repo;
pub mod vessel_of_interest_repo;
pub mod weighting_repo;

pub use eod_setting_repo::EodSettingRepo;
pub use species_toggle_repo::SpeciesToggleRepo;
pub use vessel_of_interest_repo::VesselOfInterestRepo;
pub use weighting_repo::WeightingRepo;
