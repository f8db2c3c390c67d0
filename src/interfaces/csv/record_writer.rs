use crate::domain::package::PackageRecord;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct RecordRow<'a> {
    barcode: &'a str,
    status: &'a str,
    payment: String,
    timestamp: String,
    user_id: i64,
    username: Option<&'a str>,
    first_name: Option<&'a str>,
    last_name: Option<&'a str>,
}

impl<'a> From<&'a PackageRecord> for RecordRow<'a> {
    fn from(record: &'a PackageRecord) -> Self {
        Self {
            barcode: record.identifier.as_str(),
            status: record.disposition.tag(),
            payment: record.amount.to_string(),
            timestamp: record.committed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            user_id: record.submitter.id,
            username: record.submitter.username.as_deref(),
            first_name: record.submitter.first_name.as_deref(),
            last_name: record.submitter.last_name.as_deref(),
        }
    }
}

/// Writes committed records as plain CSV rows for the external exporter.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_records(&mut self, records: &[PackageRecord]) -> Result<()> {
        if records.is_empty() {
            // Serialize writes the header lazily; keep it for empty days too.
            self.writer.write_record([
                "barcode",
                "status",
                "payment",
                "timestamp",
                "user_id",
                "username",
                "first_name",
                "last_name",
            ])?;
        }
        for record in records {
            self.writer.serialize(RecordRow::from(record))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identifier::Identifier;
    use crate::domain::package::{Amount, Disposition, Submitter};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_records_are_written_in_order() {
        let committed_at = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();
        let records = vec![
            PackageRecord {
                identifier: Identifier::parse("AB1234567").unwrap(),
                disposition: Disposition::Payment,
                amount: Amount::new(dec!(150.5)).unwrap(),
                submitter: Submitter {
                    id: 7,
                    username: Some("courier".to_string()),
                    first_name: None,
                    last_name: None,
                },
                committed_at,
            },
            PackageRecord {
                identifier: Identifier::parse("CD7654321").unwrap(),
                disposition: Disposition::Returned,
                amount: Amount::ZERO,
                submitter: Submitter::new(8),
                committed_at,
            },
        ];

        let mut buffer = Vec::new();
        RecordWriter::new(&mut buffer).write_records(&records).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(
            lines[0],
            "barcode,status,payment,timestamp,user_id,username,first_name,last_name"
        );
        assert_eq!(lines[1], "AB1234567,payment,150.5,2024-05-17 09:30:00,7,courier,,");
        assert_eq!(lines[2], "CD7654321,returned,0,2024-05-17 09:30:00,8,,,");
    }

    #[test]
    fn test_empty_day_still_has_header() {
        let mut buffer = Vec::new();
        RecordWriter::new(&mut buffer).write_records(&[]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "barcode,status,payment,timestamp,user_id,username,first_name,last_name\n"
        );
    }
}
