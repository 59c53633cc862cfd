use ttl::models::AccountReport;
use ttl::Result;

use csv::Writer;

/// Serializes the report as CSV, one row per account
pub fn write_report(report: &[AccountReport]) -> Result<String> {
    let mut wtr = Writer::from_writer(vec![]);

    for account_report in report {
        log::debug!("Serializing report: {account_report:?}");
        wtr.serialize(account_report)?;
    }

    let utf8 = wtr.into_inner()?;

    return Ok(String::from_utf8(utf8)?);
}
