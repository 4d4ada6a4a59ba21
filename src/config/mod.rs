use anyhow::{Context, Result};

pub mod route;
pub mod vehicle;

pub use route::*;
pub use vehicle::*;

#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub route: RouteConfig,
    pub vehicle: VehicleConfig,
}

impl SimulationConfig {
    pub fn load_from_files(route_path: &str, vehicle_path: &str) -> Result<Self> {
        let route_content = std::fs::read_to_string(route_path)
            .with_context(|| format!("Failed to read route configuration '{}'", route_path))?;
        let vehicle_content = std::fs::read_to_string(vehicle_path)
            .with_context(|| format!("Failed to read vehicle configuration '{}'", vehicle_path))?;

        let route: RouteConfig = toml::from_str(&route_content)?;
        let vehicle: VehicleConfig = toml::from_str(&vehicle_content)?;

        // Validate configurations
        route.validate()?;
        vehicle.validate()?;

        Ok(SimulationConfig { route, vehicle })
    }

    pub fn validate(&self) -> Result<()> {
        self.route.validate()?;
        self.vehicle.validate()
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub(crate) fn check_probability(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow::anyhow!("{} must be in range [0, 1], got {}", name, value));
    }
    Ok(())
}
