pub mod app_config;
pub mod database;
pub mod ride_repo;
pub mod airbear_repo;
pub mod spot_repo;
pub mod profile_repo;
pub mod bodega_repo;
pub mod memory;
pub mod stripe;
pub mod gotrue;

pub use database::DbClient;
pub use ride_repo::StoreRideRepository;
pub use airbear_repo::StoreAirBearRepository;
pub use spot_repo::StoreSpotRepository;
pub use profile_repo::StoreProfileRepository;
pub use bodega_repo::StoreBodegaRepository;
pub use memory::MemoryStore;
pub use stripe::StripeClient;
pub use gotrue::GoTrueClient;
