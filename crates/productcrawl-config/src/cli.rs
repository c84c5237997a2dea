//! CLI flags. Mutually-exclusive high-level modes: REST server,
//! job-server long-poll worker, queue consumer, single-URL test, file-of-URLs
//! test.

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "productcrawl", about = "Distributed product-crawl worker")]
pub struct CliArgs {
    #[arg(long, default_value = "production")]
    pub env: String,

    /// Kept for CLI-surface parity; profiling is not wired up in this binary.
    #[arg(long, default_value_t = false)]
    pub pprof: bool,

    #[arg(long, default_value_t = false)]
    pub job: bool,

    #[arg(long, default_value_t = false)]
    pub rest: bool,

    #[arg(long, default_value_t = false)]
    pub test: bool,

    #[arg(long)]
    pub test_file: Option<String>,

    #[arg(long)]
    pub job_type: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub file: Option<String>,

    #[arg(long, default_value_t = false)]
    pub consume: bool,

    #[arg(long)]
    pub worker_id: Option<String>,

    #[arg(long)]
    pub jobserver: Option<String>,
}

/// The mode the binary was invoked in. Exactly one high-level mode is valid
/// per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Rest,
    JobServerWorker,
    QueueConsumer,
    SingleUrlTest { url: String },
    FileOfUrlsTest { file: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ModeError {
    #[error("no run mode selected: pass one of --rest, --job, --consume, --test, --test-file")]
    NoneSelected,
    #[error("more than one run mode selected; modes are mutually exclusive")]
    MultipleSelected,
    #[error("--test requires --url")]
    MissingTestUrl,
    #[error("--test-file requires --file")]
    MissingTestFile,
}

impl CliArgs {
    pub fn run_mode(&self) -> Result<RunMode, ModeError> {
        let selected = [self.rest, self.job, self.consume, self.test, self.test_file.is_some()]
            .iter()
            .filter(|b| **b)
            .count();

        if selected == 0 {
            return Err(ModeError::NoneSelected);
        }
        if selected > 1 {
            return Err(ModeError::MultipleSelected);
        }

        if self.rest {
            Ok(RunMode::Rest)
        } else if self.job {
            Ok(RunMode::JobServerWorker)
        } else if self.consume {
            Ok(RunMode::QueueConsumer)
        } else if self.test {
            self.url.clone().map(|url| RunMode::SingleUrlTest { url }).ok_or(ModeError::MissingTestUrl)
        } else {
            let file = self.test_file.clone().ok_or(ModeError::MissingTestFile)?;
            Ok(RunMode::FileOfUrlsTest { file })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            env: "production".into(),
            pprof: false,
            job: false,
            rest: false,
            test: false,
            test_file: None,
            job_type: None,
            url: None,
            file: None,
            consume: false,
            worker_id: None,
            jobserver: None,
        }
    }

    #[test]
    fn rejects_no_mode_selected() {
        assert!(matches!(base_args().run_mode(), Err(ModeError::NoneSelected)));
    }

    #[test]
    fn rejects_multiple_modes_selected() {
        let mut args = base_args();
        args.rest = true;
        args.job = true;
        assert!(matches!(args.run_mode(), Err(ModeError::MultipleSelected)));
    }

    #[test]
    fn single_url_test_requires_url() {
        let mut args = base_args();
        args.test = true;
        assert!(matches!(args.run_mode(), Err(ModeError::MissingTestUrl)));
        args.url = Some("http://example.com".into());
        assert_eq!(args.run_mode().unwrap(), RunMode::SingleUrlTest { url: "http://example.com".into() });
    }
}
