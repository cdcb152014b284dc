use crate::error::HairpinError;
use crate::stats::{StatField, StatRecord};

/// FILTER ID attached to variants that look like hairpin artifacts
pub const FILTER_ID: &str = "HP";
pub const FILTER_DESCRIPTION: &str = "LCM Hairpin Filter v1.0.8";

const MIN_READS_UNIQUE: f64 = 2.0;
const MIN_USED_STATS: f64 = 1.0;
const MIN_SD: f64 = 2.0;
const MAX_FIVE_PRIME_FRACTION: f64 = 0.9;
const SINGLE_STRAND_MIN_SD: f64 = 4.0;
const BOTH_STRANDS_MIN_MAD: f64 = 2.0;
const BOTH_STRANDS_MIN_SD: f64 = 10.0;

/// Decide whether the variant behind `stat` passes the hairpin
/// filter. `false` means the variant should be tagged `HP`.
///
/// Evaluation short-circuits in rule order. A field that is `NA`
/// only turns into an error when the rule actually has to compare
/// or divide it.
pub fn passes(stat: &StatRecord) -> Result<bool, HairpinError> {
    Ok(stat.reads_unique >= MIN_READS_UNIQUE
        && variable_positions(stat)?
        && no_five_prime_bias(stat)?)
}

/// Reads supporting the variant must be spread out along the read on
/// at least one strand.
fn variable_positions(stat: &StatRecord) -> Result<bool, HairpinError> {
    let pos_spread = stat.sd_pos.is_some_and(|sd| sd > MIN_SD);
    let neg_spread = stat.sd_neg.is_some_and(|sd| sd > MIN_SD);

    Ok((stat.mad_pos.is_none() && neg_spread)
        || (stat.mad_neg.is_none() && pos_spread)
        || (stat.require(StatField::PosUsedStats)? > MIN_USED_STATS && pos_spread)
        || (stat.require(StatField::NegUsedStats)? > MIN_USED_STATS && neg_spread))
}

/// Supporting reads must not pile up at the 5' end of the strand(s)
/// with usable statistics.
fn no_five_prime_bias(stat: &StatRecord) -> Result<bool, HairpinError> {
    use StatField::*;

    let pos_used = stat.require(PosUsedStats)?;
    let neg_used = stat.require(NegUsedStats)?;

    let pos_usable = pos_used > MIN_USED_STATS;
    let neg_usable = neg_used > MIN_USED_STATS;

    let pos_fraction_ok = || -> Result<bool, HairpinError> {
        Ok(stat.require(PosPrime)? / pos_used <= MAX_FIVE_PRIME_FRACTION)
    };
    let neg_fraction_ok = || -> Result<bool, HairpinError> {
        Ok(stat.require(NegPrime)? / neg_used <= MAX_FIVE_PRIME_FRACTION)
    };

    match (pos_usable, neg_usable) {
        (false, true) => Ok(neg_fraction_ok()?
            || (stat.require(MadNeg)? > 0.0 && stat.require(SdNeg)? >= SINGLE_STRAND_MIN_SD)),

        (true, false) => Ok(pos_fraction_ok()?
            || (stat.require(MadPos)? > 0.0 && stat.require(SdPos)? >= SINGLE_STRAND_MIN_SD)),

        // used stats exceed 1 on both strands here
        (true, true) => {
            let forward = pos_fraction_ok()?
                || (pos_used > 2.0 && stat.require(MadPos)? > BOTH_STRANDS_MIN_MAD)
                || stat.require(SdNeg)? > BOTH_STRANDS_MIN_SD;

            Ok(forward
                && (neg_fraction_ok()?
                    || (neg_used > 2.0 && stat.require(MadNeg)? > BOTH_STRANDS_MIN_MAD)
                    || stat.require(SdPos)? > BOTH_STRANDS_MIN_SD))
        }

        (false, false) => Ok(false),
    }
}
