//! Config file to channel summaries, without an engine.

use std::io::Write;

use approx::assert_relative_eq;
use photonrig_core::{
    merge_pairs, summarize_with_model, time_axis, AnalysisConfig, AnalysisKind, ChannelHistograms,
    ChannelId, ColorModel, CorrelationPairSpec, Error, Histogram, RawHistograms,
};

fn write_config(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_drives_summary() {
    let file = write_config(
        r#"{
            "spectrometer": { "center_wavelength_nm": 600.0, "pixel_width_nm": 2.0,
                              "channels": ["h4", "h2"] },
            "timing": { "bins": 3, "binsize_ps": 1000, "time_unit": "ns" }
        }"#,
    );
    let config = AnalysisConfig::from_file(file.path()).unwrap();
    assert_eq!(config.scan.cancel_poll_interval, 100);

    let plan = config.bin_plan().unwrap();
    assert_eq!(plan.edges(), &[598.0, 600.0, 602.0]);

    let params = config.recipe_params(AnalysisKind::Lifetime);
    let axis = time_axis(params.bins, params.binsize_ps, config.timing.time_unit);
    assert_eq!(axis, vec![0.0, 1.0, 2.0]);

    let mut histograms = ChannelHistograms::new();
    histograms.insert(ChannelId::H4, Histogram::from(vec![0, 5, 2]));
    histograms.insert(ChannelId::H2, Histogram::from(vec![7, 0, 7]));

    let channels = summarize_with_model(
        &histograms,
        &config.spectrometer.channels,
        &axis,
        &plan,
        ColorModel::Simple,
    )
    .unwrap();

    // Wavelengths follow configured order, not channel number.
    assert_eq!(channels[0].id, ChannelId::H4);
    assert_relative_eq!(channels[0].wavelength, 599.0);
    assert_relative_eq!(channels[0].lifetime_value, 1.0);
    assert_eq!(channels[0].color, ColorModel::Simple.apply(599.0));

    assert_eq!(channels[1].id, ChannelId::H2);
    assert_relative_eq!(channels[1].wavelength, 601.0);
    assert_eq!(channels[1].peak_bin_index, 0);
    assert_eq!(channels[1].total_counts, 14);
}

#[test]
fn test_config_file_errors() {
    let garbage = write_config("{ not json");
    assert!(matches!(
        AnalysisConfig::from_file(garbage.path()),
        Err(Error::ConfigError(_))
    ));

    let duplicate = write_config(r#"{ "spectrometer": { "channels": ["h2", "h2"] } }"#);
    assert!(matches!(
        AnalysisConfig::from_file(duplicate.path()),
        Err(Error::InvalidConfiguration(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        AnalysisConfig::from_file(dir.path().join("missing.json")),
        Err(Error::ConfigError(_))
    ));
}

#[test]
fn test_correlation_params_feed_pair_merge() {
    let config = AnalysisConfig::new().with_bins(2, 2000);
    let params = config.recipe_params(AnalysisKind::Correlation);
    assert_eq!(params.det_delay_ps, None);

    let raw: RawHistograms = [
        ("h24".to_string(), vec![3, 1]),
        ("h42".to_string(), vec![0, 9]),
    ]
    .into_iter()
    .collect();
    let specs = [
        CorrelationPairSpec::between(ChannelId::H2, ChannelId::H4),
        CorrelationPairSpec::between(ChannelId::H3, ChannelId::H4),
    ];
    let merged = merge_pairs(&raw, &specs, params.bins, params.binsize_ps);

    let h24 = merged["h24"].as_ref().unwrap();
    assert_eq!(h24.histogram, vec![3, 1, 0, 9]);
    assert_eq!(h24.delay_axis, vec![-4.0, -2.0, 0.0, 2.0]);
    assert!(merged["h34"].is_err());
}
