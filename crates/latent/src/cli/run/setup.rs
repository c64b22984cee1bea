//! Config overrides from `latent run` flags.

use latent_core::Config;

use super::RunArgs;

/// Apply command-line flags on top of the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(parallel) = args.parallel {
        config.processing.parallel_workers = parallel;
    }
    if args.recursive {
        config.processing.recursive = true;
    }
    if let Some(top_k) = args.top_k {
        config.tagging.top_k = top_k;
    }
    if let Some(seed) = args.seed {
        config.reduction.seed = seed;
    }
    if let Some(device) = args.device {
        config.embedding.device = device.into();
    }
    if let Some(vocabulary) = &args.vocabulary {
        config.tagging.vocabulary_file = Some(vocabulary.to_string_lossy().into_owned());
    }
    if args.no_tags {
        config.tagging.enabled = false;
    }
    if args.no_2d {
        config.reduction.enable_2d = false;
    }
    if args.no_3d {
        config.reduction.enable_3d = false;
    }
    if args.pretty {
        config.output.pretty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::run::DeviceArg;
    use latent_core::Device;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            source: PathBuf::from("./images"),
            output: None,
            parallel: None,
            top_k: None,
            seed: None,
            device: None,
            vocabulary: None,
            recursive: false,
            no_tags: false,
            no_2d: false,
            no_3d: false,
            pretty: false,
        }
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let mut config = Config::default();
        apply_overrides(&mut config, &args());
        assert_eq!(config.processing.parallel_workers, 4);
        assert_eq!(config.tagging.top_k, 5);
        assert_eq!(config.reduction.seed, 42);
        assert!(config.tagging.enabled);
    }

    #[test]
    fn test_flags_override() {
        let mut config = Config::default();
        let args = RunArgs {
            parallel: Some(8),
            top_k: Some(3),
            seed: Some(7),
            device: Some(DeviceArg::Cuda),
            vocabulary: Some(PathBuf::from("/tmp/labels.txt")),
            recursive: true,
            no_tags: true,
            no_2d: true,
            ..args()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.processing.parallel_workers, 8);
        assert!(config.processing.recursive);
        assert_eq!(config.tagging.top_k, 3);
        assert_eq!(config.reduction.seed, 7);
        assert_eq!(config.embedding.device, Device::Cuda);
        assert_eq!(config.tagging.vocabulary_file.as_deref(), Some("/tmp/labels.txt"));
        assert!(!config.tagging.enabled);
        assert!(!config.reduction.enable_2d);
        assert!(config.reduction.enable_3d);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let mut config = Config::default();
        let args = RunArgs {
            parallel: Some(0),
            ..args()
        };
        apply_overrides(&mut config, &args);
        assert!(config.validate().is_err());
    }
}
