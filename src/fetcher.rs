use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::api::{ApiSeries, SeriesApi};
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::table::{load_series_codes, output_path, ObservationRow, SeriesTable};
use crate::window::YearWindow;

/// A window whose response carried no `value` for any observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingWindow {
    pub index: usize,
    pub code: String,
    pub window: YearWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSeries {
    pub index: usize,
    pub code: String,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<WrittenSeries>,
    pub missing: Vec<MissingWindow>,
    pub requests: usize,
}

impl RunSummary {
    pub fn total_rows(&self) -> usize {
        self.written.iter().map(|w| w.rows).sum()
    }
}

/// Flattens one response into rows, tagging each returned series with its
/// position in the response. `None` when no observation has a `value`.
pub fn window_rows(series: &[ApiSeries]) -> Option<Vec<ObservationRow>> {
    let has_value = series
        .iter()
        .flat_map(|s| s.data.iter())
        .any(|obs| obs.value.is_some());
    if !has_value {
        return None;
    }

    let rows = series
        .iter()
        .enumerate()
        .flat_map(|(series_id, s)| {
            s.data.iter().enumerate().map(move |(position, obs)| ObservationRow {
                position,
                series_id,
                year: obs.year.clone(),
                period: obs.period.clone(),
                value: obs.value.clone(),
            })
        })
        .collect();
    Some(rows)
}

pub struct SeriesFetcher<'a, A: SeriesApi + ?Sized> {
    api: &'a A,
    config: &'a FetchConfig,
}

impl<'a, A: SeriesApi + ?Sized> SeriesFetcher<'a, A> {
    pub fn new(api: &'a A, config: &'a FetchConfig) -> Self {
        SeriesFetcher { api, config }
    }

    pub fn windows(&self) -> Vec<YearWindow> {
        YearWindow::span(
            self.config.min_year,
            self.config.max_year,
            self.config.window_years,
            self.config.clamp_end_year,
        )
    }

    /// Fetches every code in the input table and writes one CSV per code,
    /// printing progress and missing-data lines to stdout.
    ///
    /// Fails fast: a transport or decoding error stops the run, the file for
    /// the code in flight is not written, and files already written stay.
    pub async fn run(&self) -> FetchResult<RunSummary> {
        self.run_with_output(&mut io::stdout()).await
    }

    pub async fn run_with_output<W: Write>(&self, out: &mut W) -> FetchResult<RunSummary> {
        let codes = load_series_codes(&self.config.input, &self.config.code_column)?;
        let windows = self.windows();
        info!(
            input = %self.config.input.display(),
            series = codes.len(),
            windows = windows.len(),
            "starting pull"
        );

        let mut summary = RunSummary::default();
        let mut used_paths = HashSet::new();
        for (j, code) in codes.iter().enumerate() {
            writeln!(out, "{}", j).map_err(FetchError::Console)?;

            let table = match self.fetch_series(j, code, &windows, &mut summary, out).await {
                Ok(t) => t,
                Err(e) => {
                    if e.is_remote() {
                        error!(index = j, code = %code, "remote fetch failed, aborting run");
                    }
                    return Err(e);
                }
            };

            if table.is_empty() {
                warn!(index = j, code = %code, "no observations, writing header only");
            }
            let path = self.unique_path(j, code, &mut used_paths);
            table.write_csv(&path)?;
            debug!(index = j, code = %code, rows = table.len(), path = %path.display(), "wrote series");

            summary.written.push(WrittenSeries {
                index: j,
                code: code.clone(),
                path,
                rows: table.len(),
            });
        }

        Ok(summary)
    }

    /// Output path for row `j`. Codes that name an already-written file get
    /// the row index appended so no earlier file is overwritten.
    fn unique_path(&self, j: usize, code: &str, used: &mut HashSet<PathBuf>) -> PathBuf {
        let prefix = &self.config.output_prefix;
        let mut path = output_path(prefix, j, code, self.config.name_by_code);
        let mut stem = code.to_string();
        while !used.insert(path.clone()) {
            stem = format!("{}_{}", stem, j);
            let renamed = output_path(prefix, j, &stem, true);
            warn!(
                index = j,
                code,
                taken = %path.display(),
                path = %renamed.display(),
                "output name already used, appending row index"
            );
            path = renamed;
        }
        path
    }

    async fn fetch_series<W: Write>(
        &self,
        index: usize,
        code: &str,
        windows: &[YearWindow],
        summary: &mut RunSummary,
        out: &mut W,
    ) -> FetchResult<SeriesTable> {
        let mut table = SeriesTable::new(code);

        for &window in windows {
            let response = self.api.fetch_window(code, window).await?;
            summary.requests += 1;

            let series = response.series(code, window)?;
            match window_rows(series) {
                Some(rows) => {
                    debug!(
                        code,
                        %window,
                        rows = rows.len(),
                        series = rows.last().map_or(0, |r| r.series_id + 1),
                        returned = ?series.iter().map(|s| s.series_id.as_deref()).collect::<Vec<_>>(),
                        "window fetched"
                    );
                    table.extend(rows);
                }
                None => {
                    writeln!(out, "Missing Data   {}  {}", window.start, code)
                        .map_err(FetchError::Console)?;
                    if !response.message.is_empty() {
                        warn!(
                            code,
                            %window,
                            status = response.status.as_deref().unwrap_or("?"),
                            message = %response.message.join("; "),
                            "no values returned"
                        );
                    }
                    summary.missing.push(MissingWindow {
                        index,
                        code: code.to_string(),
                        window,
                    });
                }
            }
        }

        Ok(table)
    }
}
