mod task;

pub use task::DownloadTask;

use crate::config::Config;
use itertools::iproduct;
use std::sync::Arc;

/// Days `01`..`31`. The archive ignores days that do not exist in a given month.
pub fn all_days() -> Vec<String> {
    (1..=31).map(|day| format!("{day:02}")).collect()
}

/// Hourly marks `00:00`..`23:00`.
pub fn all_times() -> Vec<String> {
    (0..24).map(|hour| format!("{hour:02}:00")).collect()
}

/// Enumerates one task per (variable, year, month), variable outermost and month innermost.
pub fn plan_tasks(app_config: &Config) -> Vec<DownloadTask> {
    let dataset: Arc<str> = Arc::from(app_config.dataset.as_str());
    let days: Arc<[String]> = all_days().into();
    let times: Arc<[String]> = all_times().into();
    let output_dir = Arc::new(app_config.output.path.clone());
    let extension: Arc<str> = Arc::from(app_config.output.extension.as_str());

    iproduct!(
        app_config.variables.iter(),
        app_config.years.iter(),
        app_config.months.iter()
    )
    .map(|(variable, year, month)| DownloadTask {
        dataset: dataset.clone(),
        variable: Arc::from(variable.name.as_str()),
        short_name: Arc::from(variable.short_name.as_str()),
        year: format!("{year:04}"),
        month: format!("{month:02}"),
        days: days.clone(),
        times: times.clone(),
        area: app_config.area,
        output_dir: output_dir.clone(),
        extension: extension.clone(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{VariableDef, YearRange};
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn single_variable_config() -> Config {
        let mut config = Config::default();
        config.variables = vec![VariableDef::new("2m_temperature", "tas")];
        config.years = YearRange {
            start: 1966,
            end: 1966,
        };
        config.output.path = PathBuf::from("/data/era5");
        config
    }

    #[test]
    fn test_one_task_per_month_for_single_year() {
        let tasks = plan_tasks(&single_variable_config());

        assert_eq!(tasks.len(), 12);
        let paths: Vec<PathBuf> = tasks.iter().map(DownloadTask::output_path).collect();
        assert_eq!(paths[0], PathBuf::from("/data/era5/tas/tas_1966_01.nc"));
        assert_eq!(paths[11], PathBuf::from("/data/era5/tas/tas_1966_12.nc"));
    }

    #[test]
    fn test_cartesian_product_without_duplicates() {
        let mut config = Config::default();
        config.years = YearRange {
            start: 1990,
            end: 1994,
        };
        config.months = vec![1, 6, 12];

        let tasks = plan_tasks(&config);
        assert_eq!(tasks.len(), 2 * 5 * 3);

        let unique: HashSet<(String, String, String)> = tasks
            .iter()
            .map(|t| (t.variable.to_string(), t.year.clone(), t.month.clone()))
            .collect();
        assert_eq!(unique.len(), tasks.len());

        for variable in &config.variables {
            for year in 1990..=1994 {
                for month in [1, 6, 12] {
                    assert!(unique.contains(&(
                        variable.name.clone(),
                        format!("{year:04}"),
                        format!("{month:02}")
                    )));
                }
            }
        }
    }

    #[test]
    fn test_ordering_is_variable_then_year_then_month() {
        let mut config = Config::default();
        config.years = YearRange {
            start: 2000,
            end: 2001,
        };
        config.months = vec![1, 2];

        let order: Vec<String> = plan_tasks(&config)
            .iter()
            .map(|t| format!("{}_{}_{}", t.short_name, t.year, t.month))
            .collect();
        assert_eq!(
            order,
            vec![
                "tas_2000_01",
                "tas_2000_02",
                "tas_2001_01",
                "tas_2001_02",
                "pr_2000_01",
                "pr_2000_02",
                "pr_2001_01",
                "pr_2001_02",
            ]
        );
    }

    #[test]
    fn test_days_and_times_are_constant() {
        let tasks = plan_tasks(&single_variable_config());
        for task in &tasks {
            assert_eq!(task.days.len(), 31);
            assert_eq!(task.days.first().map(String::as_str), Some("01"));
            assert_eq!(task.days.last().map(String::as_str), Some("31"));
            assert_eq!(task.times.len(), 24);
            assert_eq!(task.times.first().map(String::as_str), Some("00:00"));
            assert_eq!(task.times.last().map(String::as_str), Some("23:00"));
        }
    }

    #[test]
    fn test_task_request_carries_task_parameters() {
        let tasks = plan_tasks(&single_variable_config());
        let request = tasks[2].request();

        assert_eq!(request.variable, vec!["2m_temperature".to_string()]);
        assert_eq!(request.year, "1966");
        assert_eq!(request.month, "03");
        assert_eq!(request.area, [10.0, 90.0, -15.0, 145.0]);
        assert_eq!(tasks[2].to_string(), "tas, 1966-03");
    }
}
