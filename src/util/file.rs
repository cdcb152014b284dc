use anyhow::{self};

use rust_htslib::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

///
/// Open a text file for line-by-line streaming. Files ending with
/// `.gz` or `.bgz` go through the bgzf reader.
///
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let buf: Box<dyn BufRead> = match Path::new(input_file).extension().and_then(|x| x.to_str()) {
        Some("gz") | Some("bgz") => {
            let _file = bgzf::Reader::from_path(input_file)?;
            Box::new(BufReader::new(_file))
        }

        _ => {
            let _file = File::open(input_file)?;
            Box::new(BufReader::new(_file))
        }
    };
    Ok(buf)
}
