// Rust guideline compliant 2026-10-19

//! Human-readable end-of-run summary printed to stdout.

use std::fmt;

use monitor::WorkerRecord;

use crate::orchestrator::RunReport;

/// The final statistics block; print it with `{}`.
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a>(pub &'a RunReport);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let doc = &report.document;
        let rule = "=".repeat(60);

        writeln!(f, "\n{rule}\nFINALNE STATYSTYKI SYSTEMU\n{rule}")?;
        writeln!(f, "\n[OGOLNE]:")?;
        writeln!(f, "  Czas wykonania: {} s", doc.metadata.total_time_seconds)?;
        writeln!(f, "  Start: {}", doc.metadata.start_time.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "  Koniec: {}", doc.metadata.end_time.format("%Y-%m-%d %H:%M:%S"))?;
        if report.interrupted {
            writeln!(f, "  Przerwano przez operatora")?;
        }

        writeln!(f, "\n[PRODUKCJA I KONSUMPCJA]:")?;
        writeln!(f, "  Wyprodukowano: {} elementów", doc.statistics.total_produced)?;
        writeln!(f, "  Skonsumowano: {} elementów", doc.statistics.total_consumed)?;
        writeln!(f, "  Odrzucono (wadliwe): {} elementów", report.rejected())?;
        writeln!(f, "  W kolejce: {} elementów", report.queue_size)?;

        writeln!(f, "\n[WYDAJNOSC]:")?;
        writeln!(f, "  Średnia przepustowość: {} elem/s", doc.statistics.average_throughput_per_sec)?;
        writeln!(f, "  Efektywność: {}%", doc.statistics.efficiency_percent)?;

        section(f, "[PRODUKCJA PER PRODUCENT]:", "Producent", &doc.producers)?;
        section(f, "[KONSUMPCJA PER KONSUMENT]:", "Konsument", &doc.consumers)?;

        if !report.forced.is_empty() || !report.failed.is_empty() {
            writeln!(f, "\n[ZAKOŃCZENIA AWARYJNE]:")?;
            for worker in &report.forced {
                writeln!(f, "  {worker}: wymuszone zakończenie")?;
            }
            for worker in &report.failed {
                writeln!(f, "  {worker}: błąd")?;
            }
        }

        writeln!(f, "\n{rule}")
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str, label: &str, records: &[WorkerRecord]) -> fmt::Result {
    writeln!(f, "\n{title}")?;
    for record in records {
        writeln!(f, "  {label} {}: {} elementów: {:?}", record.id, record.count, record.items)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
