use anyhow::{Context, Result};
use clap::Parser;
use std::io;

use usn_dump::application::dto::DumpOptions;
use usn_dump::application::DumpJournalUseCase;
use usn_dump::domain::services::classify_source;
use usn_dump::infrastructure::decoders::UsnJournalDecoder;
use usn_dump::infrastructure::file_systems::NtfsImageOpener;
use usn_dump::infrastructure::persistence::JsonLinesWriter;
use usn_dump::presentation::cli::{init_logging, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let severity = cli.severity()?;
    init_logging(severity);

    let source = classify_source(&cli.source, cli.is_volume)
        .with_context(|| format!("Cannot use {} as a journal source", cli.source))?;

    let options = DumpOptions::default();
    let decoder = UsnJournalDecoder::new(options.read_chunk_size);
    let use_case = DumpJournalUseCase::new(NtfsImageOpener::new(), decoder, options);

    let stdout = io::stdout();
    let mut writer = JsonLinesWriter::new(stdout.lock());

    let report = use_case
        .execute(&source, &mut writer)
        .with_context(|| format!("Failed to dump {}", source))?;

    tracing::info!("{}", report.summary());
    Ok(())
}
