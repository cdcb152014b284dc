use crate::error::HairpinError;
use crate::hairpin::{FILTER_DESCRIPTION, FILTER_ID};
use crate::merge::{Variant, VariantSink};

use anyhow::{self, Context};
use rust_htslib::bcf::{self, header::HeaderRecord, Format, Read};

/// Open a VCF, bgzipped VCF or BCF file for streaming
pub fn open_reader(vcf_file: &str) -> anyhow::Result<bcf::Reader> {
    bcf::Reader::from_path(vcf_file)
        .with_context(|| format!("VCF file could not be read: {}", vcf_file))
}

/// Does the header already carry a FILTER line with this ID?
pub fn has_filter_line(header: &bcf::header::HeaderView, id: &str) -> bool {
    header.header_records().into_iter().any(|record| match record {
        HeaderRecord::Filter { values, .. } => values.get("ID").is_some_and(|x| x == id),
        _ => false,
    })
}

/// Copy the input header and declare the hairpin FILTER in it
pub fn hairpin_header(template: &bcf::header::HeaderView) -> bcf::Header {
    let mut header = bcf::Header::from_template(template);

    if has_filter_line(template, FILTER_ID) {
        log::warn!("input header already defines FILTER/{}; reusing it", FILTER_ID);
    } else {
        let line = format!(
            "##FILTER=<ID={},Description=\"{}\">",
            FILTER_ID, FILTER_DESCRIPTION
        );
        header.push_record(line.as_bytes());
    }
    header
}

/// `(uncompressed, format)` for an output path: `.bcf` is BCF,
/// `.gz`/`.bgz` is bgzipped VCF, anything else plain VCF.
fn output_format(vcf_file: &str) -> (bool, Format) {
    if vcf_file.ends_with(".bcf") {
        (false, Format::Bcf)
    } else if vcf_file.ends_with(".gz") || vcf_file.ends_with(".bgz") {
        (false, Format::Vcf)
    } else {
        (true, Format::Vcf)
    }
}

/// Variant writer. Records read from the input are translated into
/// the output header before they get tagged.
pub struct VcfSink {
    writer: bcf::Writer,
}

impl VcfSink {
    pub fn from_path(vcf_file: &str, header: &bcf::Header) -> anyhow::Result<Self> {
        let (uncompressed, format) = output_format(vcf_file);

        let writer = bcf::Writer::from_path(vcf_file, header, uncompressed, format)
            .with_context(|| format!("Error while getting handle for VCF output: {}", vcf_file))?;

        if !has_filter_line(writer.header(), FILTER_ID) {
            return Err(HairpinError::HeaderMutation(FILTER_ID))
                .context("Error while modifying VCF header");
        }

        Ok(VcfSink { writer })
    }
}

impl VariantSink for VcfSink {
    type Record = bcf::Record;

    fn adopt(&mut self, record: &mut bcf::Record) {
        self.writer.translate(record);
    }

    fn write(&mut self, record: &bcf::Record) -> anyhow::Result<()> {
        self.writer
            .write(record)
            .context("failed to write VCF record")
    }
}

impl Variant for bcf::Record {
    /// htslib positions are 0-based
    fn position(&self) -> i64 {
        self.pos() + 1
    }

    fn add_filter(&mut self, id: &str) -> anyhow::Result<()> {
        if !self.has_filter(id.as_bytes()) {
            self.push_filter(id.as_bytes())
                .with_context(|| format!("failed to add FILTER/{}", id))?;
        }
        Ok(())
    }
}
