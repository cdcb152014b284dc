use crate::merge::{merge, MergeSummary};
use crate::stats::StatTable;
use crate::vcf;

use anyhow::{self, Context};
use clap::Args;
use rust_htslib::bcf::Read;

#[derive(Args)]
pub struct FilterArgs {
    /// per-variant read statistics table (tab-delimited with a header
    /// row; .gz/.bgz accepted)
    stats: Box<str>,

    /// input VCF/BCF file, same variants and order as the table
    vcf: Box<str>,

    /// output VCF file (.vcf.gz for bgzip, .bcf for BCF)
    output: Box<str>,
}

/// Tag hairpin artifacts in `args.vcf` with FILTER `HP` and write the
/// result to `args.output`. Input and output handles are released
/// when this returns, on success or failure.
pub fn run(args: &FilterArgs) -> anyhow::Result<MergeSummary> {
    log::info!("Reading variants from {}", args.vcf);
    let mut reader = vcf::open_reader(&args.vcf)?;

    let header = vcf::hairpin_header(reader.header());
    let mut sink = vcf::VcfSink::from_path(&args.output, &header)?;

    log::info!("Reading statistics from {}", args.stats);
    let stats = StatTable::from_path(&args.stats)?;

    let records = reader
        .records()
        .map(|rec| rec.context("failed to read a VCF record"));

    let summary = merge(records, stats, &mut sink)?;

    log::info!(
        "Wrote {} records to {} ({} flagged as hairpin)",
        summary.written,
        args.output,
        summary.flagged
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HairpinError;
    use rust_htslib::bgzf;
    use std::io::Write;
    use std::path::Path;

    const VCF: &str = "\
##fileformat=VCFv4.2
##FILTER=<ID=q10,Description=\"Quality below 10\">
##contig=<ID=chr1,length=1000>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr1\t10\t.\tA\tT\t50\tPASS\t.
chr1\t20\t.\tC\tG\t50\tq10\t.
chr1\t30\t.\tG\tA\t50\t.\t.
chr1\t40\t.\tT\tC\t50\tPASS\t.
";

    const STATS_HEADER: &str = "Chr\tStart\tEnd\tRef\tAlt\tVar_reads_unique\tMAD_var_pos_reads\tSD_var_pos_reads\tVar_pos_reads_used_stats\tVar_pos_5_prime_15%_reads\tMAD_var_neg_reads\tSD_var_neg_reads\tVar_neg_reads_used_stats\tVar_neg_5_prime_15%_reads";

    // position 10 passes (reverse strand only, low 5' fraction)
    // position 20 is a hairpin (5' pile-up on the reverse strand)
    // position 30 has a single unique read
    // position 40 passes on both strands
    fn stats_rows(starts: [i64; 4]) -> String {
        format!(
            "{}\n\
             chr1\t{}\t10\tA\tT\t5\tNA\tNA\t0\t0\t1\t2.5\t3\t2\n\
             chr1\t{}\t20\tC\tG\t5\tNA\tNA\t0\t0\t1\t2.5\t3\t3\n\
             chr1\t{}\t30\tG\tA\t1\tNA\tNA\t0\t0\tNA\tNA\t1\t1\n\
             chr1\t{}\t40\tT\tC\t10\t1\t3\t5\t1\t1\t3\t5\t1\n",
            STATS_HEADER, starts[0], starts[1], starts[2], starts[3]
        )
    }

    fn write_file(dir: &Path, name: &str, text: &str) -> Box<str> {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path.to_str().unwrap().into()
    }

    fn args(stats: &str, vcf: &str, output: &str) -> FilterArgs {
        FilterArgs {
            stats: stats.into(),
            vcf: vcf.into(),
            output: output.into(),
        }
    }

    /// (POS, FILTER) of every record in a plain-text VCF
    fn pos_and_filters(vcf_file: &str) -> Vec<(String, String)> {
        std::fs::read_to_string(vcf_file)
            .unwrap()
            .lines()
            .filter(|x| !x.starts_with('#'))
            .map(|x| {
                let words: Vec<&str> = x.split('\t').collect();
                (words[1].to_string(), words[6].to_string())
            })
            .collect()
    }

    fn hp_header_lines(vcf_file: &str) -> usize {
        std::fs::read_to_string(vcf_file)
            .unwrap()
            .lines()
            .filter(|x| x.starts_with("##FILTER=<ID=HP,"))
            .count()
    }

    #[test]
    fn flags_hairpins_and_keeps_other_filters() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);
        let stats = write_file(dir.path(), "stats.tsv", &stats_rows([10, 20, 30, 40]));
        let out = dir.path().join("out.vcf");
        let out = out.to_str().unwrap();

        let summary = run(&args(&stats, &vcf, out)).unwrap();
        assert_eq!(summary.written, 4);
        assert_eq!(summary.flagged, 2);

        let text = std::fs::read_to_string(out).unwrap();
        assert!(text.contains("##FILTER=<ID=HP,Description=\"LCM Hairpin Filter v1.0.8\">"));

        let records = pos_and_filters(out);
        let expected = vec![
            ("10".to_string(), "PASS".to_string()),
            ("20".to_string(), "q10;HP".to_string()),
            ("30".to_string(), "HP".to_string()),
            ("40".to_string(), "PASS".to_string()),
        ];
        assert_eq!(records, expected);
    }

    #[test]
    fn rerun_on_own_output_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);
        let stats = write_file(dir.path(), "stats.tsv", &stats_rows([10, 20, 30, 40]));
        let first = dir.path().join("first.vcf");
        let first = first.to_str().unwrap();
        let second = dir.path().join("second.vcf");
        let second = second.to_str().unwrap();

        run(&args(&stats, &vcf, first)).unwrap();
        run(&args(&stats, first, second)).unwrap();

        assert_eq!(pos_and_filters(first), pos_and_filters(second));
        assert_eq!(hp_header_lines(second), 1);
    }

    #[test]
    fn position_mismatch_aborts_before_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);
        let stats = write_file(dir.path(), "stats.tsv", &stats_rows([10, 21, 30, 40]));
        let out = dir.path().join("out.vcf");
        let out = out.to_str().unwrap();

        let err = run(&args(&stats, &vcf, out)).err().unwrap();
        assert_eq!(
            err.downcast_ref::<HairpinError>(),
            Some(&HairpinError::PositionMismatch {
                variant: 20,
                stat: 21
            })
        );
        assert!(err.to_string().contains("VCF: 20, statistics: 21"));

        let records = pos_and_filters(out);
        assert_eq!(records, vec![("10".to_string(), "PASS".to_string())]);
    }

    #[test]
    fn short_statistics_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);
        let rows = stats_rows([10, 20, 30, 40]);
        let truncated: Vec<&str> = rows.lines().take(4).collect();
        let stats = write_file(dir.path(), "stats.tsv", &truncated.join("\n"));
        let out = dir.path().join("out.vcf");

        let err = run(&args(&stats, &vcf, out.to_str().unwrap())).err().unwrap();
        assert_eq!(
            err.downcast_ref::<HairpinError>(),
            Some(&HairpinError::ExtraVariants(40))
        );
    }

    #[test]
    fn malformed_statistics_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);
        let rows = stats_rows([10, 20, 30, 40]).replace("\t2.5\t3\t3\n", "\tn/a\t3\t3\n");
        let stats = write_file(dir.path(), "stats.tsv", &rows);
        let out = dir.path().join("out.vcf");

        let err = run(&args(&stats, &vcf, out.to_str().unwrap())).err().unwrap();
        let msg = format!("{:#}", err);
        assert!(msg.contains("statistics table misformatted"));
        assert!(msg.contains("statistics line 3"));
        assert!(matches!(
            err.downcast_ref::<HairpinError>(),
            Some(HairpinError::Malformed { column: "SD_var_neg_reads", .. })
        ));
    }

    #[test]
    fn missing_column_is_fatal_before_any_record() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);
        let rows = stats_rows([10, 20, 30, 40]).replacen("SD_var_neg_reads", "SD_neg", 1);
        let stats = write_file(dir.path(), "stats.tsv", &rows);
        let out = dir.path().join("out.vcf");
        let out = out.to_str().unwrap();

        let err = run(&args(&stats, &vcf, out)).err().unwrap();
        assert_eq!(
            err.downcast_ref::<HairpinError>(),
            Some(&HairpinError::MissingColumn("SD_var_neg_reads"))
        );
        assert!(pos_and_filters(out).is_empty());
    }

    #[test]
    fn unreadable_input_and_unwritable_output_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);
        let stats = write_file(dir.path(), "stats.tsv", &stats_rows([10, 20, 30, 40]));
        let out = dir.path().join("out.vcf");

        let missing = dir.path().join("missing.vcf");
        let err = run(&args(&stats, missing.to_str().unwrap(), out.to_str().unwrap()))
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("VCF file could not be read"));

        let err = run(&args(&stats, &vcf, "/nonexistent/dir/out.vcf"))
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("Error while getting handle for VCF output"));
    }

    #[test]
    fn bgzipped_statistics_and_bcf_output() {
        let dir = tempfile::tempdir().unwrap();
        let vcf = write_file(dir.path(), "in.vcf", VCF);

        let stats = dir.path().join("stats.tsv.gz");
        {
            let mut w = bgzf::Writer::from_path(&stats).unwrap();
            w.write_all(stats_rows([10, 20, 30, 40]).as_bytes()).unwrap();
        }

        let out = dir.path().join("out.bcf");
        let summary = run(&args(
            stats.to_str().unwrap(),
            &vcf,
            out.to_str().unwrap(),
        ))
        .unwrap();
        assert_eq!(summary.flagged, 2);

        let mut reader = rust_htslib::bcf::Reader::from_path(&out).unwrap();
        let flagged: Vec<bool> = reader
            .records()
            .map(|rec| rec.unwrap().has_filter("HP".as_bytes()))
            .collect();
        assert_eq!(flagged, vec![false, true, true, false]);
    }
}
