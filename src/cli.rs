//! Command line arguments

use clap::Parser;
use fluidjog_core::{Axis, MeasurementSystem};
use std::path::PathBuf;

/// Jog one axis of a FluidNC controller back and forth
#[derive(Debug, Clone, Parser)]
#[command(name = "fluidjog", version, about)]
pub struct Args {
    /// Serial port (e.g. COM3, /dev/ttyUSB0)
    #[arg(long)]
    pub port: Option<String>,

    /// Axis to jog
    #[arg(long, required_unless_present = "list_ports")]
    pub axis: Option<Axis>,

    /// Jog distance, in --units
    #[arg(long, allow_negative_numbers = true, required_unless_present = "list_ports")]
    pub distance: Option<f64>,

    /// Unit of --distance
    #[arg(long, default_value_t = MeasurementSystem::Imperial)]
    pub units: MeasurementSystem,

    /// Speed as a percentage of the axis maximum feedrate (0-100)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub speed: u32,

    /// Number of forward/backward cycles (0 = until stopped)
    #[arg(long, default_value_t = 0)]
    pub cycles: u32,

    /// Baud rate override
    #[arg(long)]
    pub baud: Option<u32>,

    /// Config file (.toml or .json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List detected CNC serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["fluidjog", "--axis", "x", "--distance", "1"]).unwrap();
        assert_eq!(args.axis, Some(Axis::X));
        assert_eq!(args.distance, Some(1.0));
        assert_eq!(args.units, MeasurementSystem::Imperial);
        assert_eq!(args.speed, 50);
        assert_eq!(args.cycles, 0);
        assert_eq!(args.port, None);
        assert!(!args.list_ports);
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "fluidjog",
            "--port",
            "/dev/ttyACM0",
            "--axis",
            "Y",
            "--distance",
            "-12.5",
            "--units",
            "mm",
            "--speed",
            "100",
            "--cycles",
            "3",
            "--baud",
            "250000",
            "--config",
            "jog.toml",
        ])
        .unwrap();
        assert_eq!(args.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(args.axis, Some(Axis::Y));
        assert_eq!(args.distance, Some(-12.5));
        assert_eq!(args.units, MeasurementSystem::Metric);
        assert_eq!(args.speed, 100);
        assert_eq!(args.cycles, 3);
        assert_eq!(args.baud, Some(250_000));
        assert_eq!(args.config, Some(PathBuf::from("jog.toml")));
    }

    #[test]
    fn test_axis_and_distance_required() {
        assert!(Args::try_parse_from(["fluidjog", "--distance", "1"]).is_err());
        assert!(Args::try_parse_from(["fluidjog", "--axis", "X"]).is_err());
    }

    #[test]
    fn test_list_ports_needs_nothing_else() {
        let args = Args::try_parse_from(["fluidjog", "--list-ports"]).unwrap();
        assert!(args.list_ports);
        assert_eq!(args.axis, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Args::try_parse_from(["fluidjog", "--axis", "Z", "--distance", "1"]).is_err());
        assert!(
            Args::try_parse_from(["fluidjog", "--axis", "X", "--distance", "1", "--speed", "150"])
                .is_err()
        );
        assert!(
            Args::try_parse_from(["fluidjog", "--axis", "X", "--distance", "1", "--cycles", "-1"])
                .is_err()
        );
    }
}
