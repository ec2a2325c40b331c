use std::fs;

use sortie_stats::{
    EpisodeRecord, EpisodeStatsGatherer, GathererConfig, GathererError, Keyed, KeyedField,
    read_report,
};
use tempfile::{TempDir, tempdir};

/// Log prefix inside a fresh temporary directory; the directory is removed
/// when the returned guard drops.
fn temp_prefix() -> Result<(TempDir, String), GathererError> {
    let dir = tempdir()?;
    let prefix = dir.path().join("nested").join("run").to_string_lossy().into_owned();
    Ok((dir, prefix))
}

fn record(win: bool) -> EpisodeRecord {
    EpisodeRecord {
        win_lose: win,
        finished_time: 1200.0,
        num_steps: 120,
        calc_time: 2.5,
        scores: Keyed::new().with("A", 1.0).with("B", -2.0),
        total_rewards: Keyed::new().with("A1", 0.5).with("B1", -0.5),
        num_alives: Keyed::new().with("A", 2).with("B", 1),
        end_reason: String::from("TIMEUP"),
    }
}

fn gatherer(prefix: &str, interval: u64, denominator: usize) -> EpisodeStatsGatherer {
    let config = GathererConfig::new(prefix)
        .with_episode_interval(interval)
        .with_rating_denominator(denominator);
    EpisodeStatsGatherer::new(config)
        .expect("valid config")
        .quiet()
}

fn lines(gatherer: &EpisodeStatsGatherer) -> Vec<String> {
    let path = gatherer.output_path().expect("log opened");
    fs::read_to_string(path)
        .expect("readable log")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn counters_follow_end_events() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 1, 100);
    let flags = [true, false, true, true, false];
    for won in flags {
        gatherer.on_episode_begin(&record(won));
        gatherer.on_episode_end(&record(won))?;
    }
    assert_eq!(gatherer.episode_counter(), 5);
    assert_eq!(gatherer.win_count(), 3);
    assert_eq!(gatherer.total_steps(), 600);
    assert_eq!(gatherer.window().len(), 5);
    Ok(())
}

#[test]
fn log_file_lands_in_created_directory() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 1, 100);
    assert!(gatherer.output_path().is_none());
    gatherer.on_episode_end(&record(true))?;

    let path = gatherer.output_path().expect("log opened").to_path_buf();
    assert!(path.exists());
    let name = path.file_name().and_then(|n| n.to_str()).expect("utf-8 name");
    // run_YYYYMMDDHHMMSS.csv
    assert!(name.starts_with("run_"));
    assert!(name.ends_with(".csv"));
    let stamp = &name["run_".len()..name.len() - ".csv".len()];
    assert_eq!(stamp.len(), 14);
    assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    Ok(())
}

#[test]
fn rows_follow_episode_interval() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 3, 100);
    let mut written = Vec::new();
    for idx in 1..=8 {
        let progress = gatherer.on_episode_end(&record(idx % 2 == 0))?;
        if progress.row_written {
            written.push(progress.episode);
        }
    }
    assert_eq!(written, vec![3, 6]);

    let lines = lines(&gatherer);
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Episode,score[A],score[B],totalReward[A1],totalReward[B1],finishedTime[s],numSteps,\
         calcTime[s],BlueWin,WinCount,WinRate[%],numAlives[A],numAlives[B],endReason"
    );
    assert!(lines[1].starts_with("3,"));
    assert!(lines[2].starts_with("6,"));
    Ok(())
}

#[test]
fn data_row_matches_reference_layout() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 1, 100);
    gatherer.on_episode_end(&record(true))?;
    gatherer.on_episode_end(&record(false))?;

    let lines = lines(&gatherer);
    assert_eq!(
        lines[2],
        "2,+1.0000000000000000e+00,-2.0000000000000000e+00,+5.0000000000000000e-01,\
         -5.0000000000000000e-01,+1.2000000000000000e+03,120,+2.5000000000000000e+00,0,1,\
         +5.0000000000000000e+01,+2.0000000000000000e+00,+1.0000000000000000e+00,TIMEUP"
    );
    Ok(())
}

#[test]
fn rolling_rate_with_two_slot_window() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 1, 2);

    let first = gatherer.on_episode_end(&record(true))?;
    assert_eq!(gatherer.window().outcomes(), &[1.0]);
    assert_eq!(first.recent_win_rate, 100.0);

    let second = gatherer.on_episode_end(&record(false))?;
    assert_eq!(gatherer.window().outcomes(), &[1.0, 0.0]);
    assert_eq!(second.recent_win_rate, 50.0);

    let third = gatherer.on_episode_end(&record(true))?;
    assert_eq!(gatherer.window().outcomes(), &[1.0, 0.0]);
    assert_eq!(third.recent_win_rate, 50.0);
    assert_eq!(third.win_count, 2);

    let report = read_report(gatherer.output_path().expect("log opened"))?;
    let rates: Vec<f64> = report.rows.iter().map(|row| row.win_rate).collect();
    assert_eq!(rates, vec![100.0, 50.0, 50.0]);
    Ok(())
}

#[test]
fn window_never_outgrows_denominator() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 1, 5);
    let flags: Vec<bool> = (0..23).map(|idx| idx % 3 == 0 || idx % 7 == 0).collect();
    for (idx, won) in flags.iter().enumerate() {
        gatherer.on_episode_end(&record(*won))?;
        assert!(gatherer.window().len() <= 5);
        assert!((gatherer.window().len() as u64) <= gatherer.episode_counter());
        assert_eq!(gatherer.episode_counter(), idx as u64 + 1);
    }
    let recent = flags[flags.len() - 5..].iter().filter(|won| **won).count() as f64;
    assert_eq!(gatherer.window().wins(), recent);
    let total = flags.iter().filter(|won| **won).count() as u64;
    assert_eq!(gatherer.win_count(), total);
    Ok(())
}

#[test]
fn key_drift_is_rejected_without_side_effects() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 1, 100);
    gatherer.on_episode_end(&record(true))?;
    let header_before = lines(&gatherer)[0].clone();

    let mut drifted = record(true);
    drifted.scores = Keyed::new().with("C", 1.0).with("D", 2.0);
    let err = gatherer.on_episode_end(&drifted);
    match err {
        Err(GathererError::SchemaDrift {
            field,
            expected,
            found,
        }) => {
            assert_eq!(field, KeyedField::Scores);
            assert_eq!(expected, vec!["A", "B"]);
            assert_eq!(found, vec!["C", "D"]);
        }
        other => panic!("expected drift error, got {other:?}"),
    }
    assert_eq!(gatherer.episode_counter(), 1);
    assert_eq!(gatherer.win_count(), 1);
    let snapshot = gatherer.snapshot();
    assert_eq!(snapshot.rejected_records, 1);
    assert!(
        snapshot
            .last_rejection
            .is_some_and(|reason| reason.contains("scores"))
    );

    gatherer.on_episode_end(&record(false))?;
    let lines = lines(&gatherer);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], header_before);
    assert!(lines[2].starts_with("2,"));
    Ok(())
}

#[test]
fn closed_gatherer_refuses_events() -> Result<(), GathererError> {
    let (_dir, prefix) = temp_prefix()?;
    let mut gatherer = gatherer(&prefix, 1, 100);
    gatherer.on_episode_end(&record(true))?;
    gatherer.close()?;
    assert!(matches!(
        gatherer.on_episode_end(&record(true)),
        Err(GathererError::Closed)
    ));
    assert_eq!(gatherer.episode_counter(), 1);
    assert!(gatherer.output_path().is_some());
    Ok(())
}

#[test]
fn unwritable_location_surfaces_io_error() -> Result<(), GathererError> {
    let (dir, prefix) = temp_prefix()?;
    // A regular file where the log directory should go.
    let blocker = dir.path().join("nested");
    fs::write(&blocker, b"not a directory")?;
    let mut gatherer = gatherer(&prefix, 1, 100);
    assert!(matches!(
        gatherer.on_episode_end(&record(true)),
        Err(GathererError::Io(_))
    ));
    assert_eq!(gatherer.episode_counter(), 0);

    // The failure is confined to that call.
    fs::remove_file(&blocker)?;
    gatherer.on_episode_end(&record(true))?;
    assert_eq!(gatherer.episode_counter(), 1);
    assert_eq!(gatherer.rejected_records(), 1);
    Ok(())
}
