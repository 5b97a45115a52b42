use crate::signal::{AveragedTrial, SignalTable, Trial};

/// Row positions where a trial starts: row 0 and every row whose sample index does not
/// advance past the previous row's.
pub fn find_trials(table: &SignalTable) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut previous: Option<usize> = None;
    for (idx, row) in table.rows.iter().enumerate() {
        match previous {
            Some(prev) if row.sample > prev => {}
            _ => starts.push(idx),
        }
        previous = Some(row.sample);
    }
    starts
}

/// Half-open row ranges between consecutive trial starts.
pub fn trial_ranges(table: &SignalTable, starts: &[usize]) -> Vec<(usize, usize)> {
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(table.len());
            (start, end)
        })
        .collect()
}

/// Cut the concatenated recording into one owned `Trial` per boundary.
pub fn separate_trials(table: &SignalTable, starts: &[usize]) -> Vec<Trial> {
    trial_ranges(table, starts)
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| Trial {
            index,
            channels: table.channels.clone(),
            rows: table.rows[start..end].to_vec(),
        })
        .collect()
}

/// Restrict every trial to samples in `[start, end)`. Trials shorter than `end` keep only
/// what they have; `start >= end` leaves every trial empty.
pub fn process_trials(trials: &[Trial], start: usize, end: usize) -> Vec<Trial> {
    trials
        .iter()
        .map(|trial| Trial {
            index: trial.index,
            channels: trial.channels.clone(),
            rows: trial
                .rows
                .iter()
                .filter(|row| row.sample >= start && row.sample < end)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Mean of every channel across the trial's samples.
pub fn average_trial(trial: &Trial) -> AveragedTrial {
    let width = trial.channels.len();
    let mut sums = vec![0.0; width];
    for row in &trial.rows {
        for (sum, value) in sums.iter_mut().zip(&row.values) {
            *sum += *value;
        }
    }
    let retained = trial.rows.len();
    let means = if retained == 0 {
        vec![f64::NAN; width]
    } else {
        sums.into_iter().map(|s| s / retained as f64).collect()
    };
    AveragedTrial {
        index: trial.index,
        channels: trial.channels.clone(),
        means,
        retained,
    }
}

pub fn average_trials(trials: &[Trial]) -> Vec<AveragedTrial> {
    trials.iter().map(average_trial).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SampleRow;

    fn table(samples: &[usize]) -> SignalTable {
        let mut table = SignalTable::new(vec!["Fz".into(), "Cz".into()]);
        for (i, &sample) in samples.iter().enumerate() {
            table.rows.push(SampleRow {
                sample,
                marker: "cong".into(),
                values: vec![i as f64, 10.0 * i as f64],
            });
        }
        table
    }

    #[test]
    fn boundaries_follow_sample_resets() {
        let t = table(&[0, 1, 2, 0, 1, 0]);
        assert_eq!(find_trials(&t), vec![0, 3, 5]);
        let trials = separate_trials(&t, &find_trials(&t));
        assert_eq!(trials.len(), 3);
        assert_eq!(trials[1].len(), 2);
        assert_eq!(trials[2].index, 2);
    }

    #[test]
    fn repeated_sample_index_starts_new_trial() {
        let t = table(&[3, 4, 4, 5]);
        assert_eq!(find_trials(&t), vec![0, 2]);
    }

    #[test]
    fn empty_table_has_no_trials() {
        let t = table(&[]);
        assert!(find_trials(&t).is_empty());
        assert!(separate_trials(&t, &[]).is_empty());
    }

    #[test]
    fn window_keeps_only_samples_in_range() {
        let t = table(&[0, 1, 2, 3, 4, 0, 1, 2, 3, 4]);
        let trials = separate_trials(&t, &find_trials(&t));
        let windowed = process_trials(&trials, 1, 4);
        for trial in &windowed {
            assert_eq!(trial.len(), 3);
            assert!(trial.rows.iter().all(|r| r.sample >= 1 && r.sample < 4));
        }
        // input untouched
        assert_eq!(trials[0].len(), 5);
    }

    #[test]
    fn short_trials_keep_available_rows() {
        let t = table(&[0, 1, 2]);
        let trials = separate_trials(&t, &find_trials(&t));
        let windowed = process_trials(&trials, 1, 10);
        assert_eq!(windowed[0].len(), 2);
        let inverted = process_trials(&trials, 2, 1);
        assert!(inverted[0].is_empty());
    }

    #[test]
    fn averages_per_channel() {
        let t = table(&[0, 1, 2, 3, 4]);
        let trials = process_trials(&separate_trials(&t, &find_trials(&t)), 1, 4);
        let avg = average_trials(&trials);
        assert_eq!(avg[0].means.len(), 2);
        assert_eq!(avg[0].retained, 3);
        assert!((avg[0].means[0] - 2.0).abs() < 1e-12);
        assert!((avg[0].means[1] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn empty_window_averages_to_nan() {
        let t = table(&[0, 1]);
        let trials = process_trials(&separate_trials(&t, &find_trials(&t)), 5, 8);
        let avg = average_trial(&trials[0]);
        assert_eq!(avg.retained, 0);
        assert_eq!(avg.means.len(), 2);
        assert!(avg.means.iter().all(|m| m.is_nan()));
    }
}
