use crate::core::radius::{RadiusScale, SLIDER_MAX, SLIDER_MIN};
use crate::utils::error::{ProxiError, Result};
use crate::utils::validation::{validate_coordinate, validate_non_empty_string, validate_range, Validate};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "proxilink")]
#[command(about = "Find services near you and send push notifications")]
pub struct CliConfig {
    /// Path to TOML configuration file (defaults to ./proxilink.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List services within a radius of a position
    Nearby(NearbyArgs),
    /// Resolve the current position through the location cache
    Locate(LocateArgs),
    /// Convert between slider positions and radii
    Radius(RadiusArgs),
    /// Send a notification to every active subscription of a user
    Push(PushArgs),
    /// Show in-app notifications and mark them read
    Notifications(NotificationsArgs),
    /// Generate a new VAPID key pair
    VapidKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// 使用者位置；沒有給就改用快取的最後位置
#[derive(Debug, Clone, Default, Args)]
pub struct PositionArgs {
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    pub lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lng: Option<f64>,

    /// Reported accuracy in meters
    #[arg(long)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Args)]
pub struct NearbyArgs {
    #[command(flatten)]
    pub position: PositionArgs,

    /// Radius in kilometers
    #[arg(long, conflicts_with = "slider")]
    pub radius: Option<f64>,

    /// Slider position (0-100), converted with the configured scale
    #[arg(long)]
    pub slider: Option<f64>,

    /// Override the radius scale from config
    #[arg(long)]
    pub scale: Option<RadiusScale>,

    /// Free-text search over title, description and category
    #[arg(long, default_value = "")]
    pub search: String,

    #[arg(long)]
    pub category: Option<String>,

    /// Skip the backend and list generated demo vendors
    #[arg(long)]
    pub demo: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct LocateArgs {
    #[command(flatten)]
    pub position: PositionArgs,

    /// Ignore the cached position and request a fresh one
    #[arg(long)]
    pub refresh: bool,

    /// Keep watching for the given number of seconds
    #[arg(long)]
    pub watch: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct RadiusArgs {
    /// Slider position to convert into a radius
    #[arg(long, conflicts_with = "km")]
    pub slider: Option<f64>,

    /// Radius in kilometers to convert into a slider position
    #[arg(long)]
    pub km: Option<f64>,

    #[arg(long)]
    pub scale: Option<RadiusScale>,
}

#[derive(Debug, Clone, Args)]
pub struct PushArgs {
    #[arg(long)]
    pub user_id: String,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub body: String,

    /// Extra JSON object forwarded to the client as `data`
    #[arg(long)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct NotificationsArgs {
    /// Only show notifications for this user
    #[arg(long)]
    pub user_id: Option<String>,

    /// Mark one notification read (repeatable)
    #[arg(long = "mark-read", value_name = "ID")]
    pub mark_read: Vec<String>,

    #[arg(long)]
    pub mark_all_read: bool,

    /// Skip the backend and show demo notifications
    #[arg(long)]
    pub demo: bool,

    /// Keep printing incoming demo notifications for the given number of seconds
    #[arg(long)]
    pub follow: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl PositionArgs {
    pub fn coordinate(&self) -> Option<crate::domain::model::Coordinate> {
        let (lat, lng) = (self.lat?, self.lng?);
        let mut coordinate = crate::domain::model::Coordinate::new(lat, lng);
        if let Some(accuracy) = self.accuracy {
            coordinate = coordinate.with_accuracy(accuracy);
        }
        Some(coordinate)
    }
}

impl Validate for PositionArgs {
    fn validate(&self) -> Result<()> {
        if let (Some(lat), Some(lng)) = (self.lat, self.lng) {
            validate_coordinate("position", lat, lng)?;
        }
        if let Some(accuracy) = self.accuracy {
            validate_range("position.accuracy", accuracy, 0.0, f64::MAX)?;
        }
        Ok(())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Nearby(args) => {
                args.position.validate()?;
                if let Some(radius) = args.radius {
                    if !(radius > 0.0) {
                        return Err(ProxiError::InvalidConfigValueError {
                            field: "radius".to_string(),
                            value: radius.to_string(),
                            reason: "radius must be greater than zero".to_string(),
                        });
                    }
                }
                if let Some(slider) = args.slider {
                    validate_range("slider", slider, SLIDER_MIN, SLIDER_MAX)?;
                }
                Ok(())
            }
            Command::Locate(args) => args.position.validate(),
            Command::Radius(args) => {
                if args.slider.is_none() && args.km.is_none() {
                    return Err(ProxiError::MissingConfigError {
                        field: "--slider or --km".to_string(),
                    });
                }
                if let Some(slider) = args.slider {
                    validate_range("slider", slider, SLIDER_MIN, SLIDER_MAX)?;
                }
                Ok(())
            }
            Command::Push(args) => {
                validate_non_empty_string("user_id", &args.user_id)?;
                validate_non_empty_string("title", &args.title)?;
                validate_non_empty_string("body", &args.body)
            }
            Command::Notifications(args) => {
                if let Some(user_id) = &args.user_id {
                    validate_non_empty_string("user_id", user_id)?;
                }
                for id in &args.mark_read {
                    validate_non_empty_string("mark_read", id)?;
                }
                Ok(())
            }
            Command::VapidKeys => Ok(()),
        }
    }
}
