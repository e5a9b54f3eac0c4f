#[cfg(test)]
mod tests {
    use crate::db::get_student_by_email;
    use crate::error::AppError;
    use crate::imports::{import_students, import_students_from_csv, parse_student_rows};
    use crate::test::utils::{TestDbBuilder, student_fields};
    use rocket::tokio;

    const HEADER: &str =
        "Name,Father Name,Roll Number,Registration Number,Email,Mobile,Course,Semester";

    #[test]
    fn test_parse_rows_basic() {
        let csv = format!(
            "{}\n{}\n{}",
            HEADER,
            "Bob,Robert Sr,R1,REG-1,bob@x.com,0400000001,CS,1",
            "Carol,Charles,R2,REG-2,carol@x.com,0400000002,CS,2"
        );

        let rows = parse_student_rows(csv.as_bytes()).expect("Parsing should succeed");
        assert_eq!(rows.len(), 2);

        let first = rows[0].result.as_ref().expect("Row should parse");
        assert_eq!(first.name, "Bob");
        assert_eq!(first.father_name, "Robert Sr");
        assert_eq!(first.roll_number, "R1");
        assert_eq!(first.email, "bob@x.com");
        assert_eq!(first.semester, "1");
        assert_eq!(rows[0].row, 1);
        assert_eq!(rows[1].row, 2);
    }

    #[test]
    fn test_parse_rows_handles_quoting_and_whitespace() {
        let csv = format!(
            "{}\n{}",
            HEADER, "\"Smith, John\", Papa Smith ,R3,REG-3, john@x.com ,,CS,1"
        );

        let rows = parse_student_rows(csv.as_bytes()).expect("Parsing should succeed");
        let row = rows[0].result.as_ref().expect("Row should parse");

        assert_eq!(row.name, "Smith, John");
        assert_eq!(row.father_name, "Papa Smith");
        assert_eq!(row.email, "john@x.com");
        assert_eq!(row.mobile, "");
    }

    #[test]
    fn test_parse_rows_isolates_malformed_rows() {
        let csv = format!(
            "{}\n{}\n{}\n{}",
            HEADER,
            "Bob,Robert Sr,R1,REG-1,bob@x.com,0400000001,CS,1",
            "too,few,columns",
            "Carol,Charles,R2,REG-2,carol@x.com,0400000002,CS,2"
        );

        let rows = parse_student_rows(csv.as_bytes()).expect("Parsing should succeed");
        assert_eq!(rows.len(), 3);

        assert!(rows[0].result.is_ok());
        assert!(rows[1].result.is_err(), "Short row should fail alone");
        assert!(rows[2].result.is_ok(), "Rows after a bad one still parse");
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        let result = parse_student_rows(b"");

        match result {
            Err(AppError::Validation(_)) => {}
            other => panic!("Expected Validation error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_import_isolates_duplicate_rows() {
        let test_db = TestDbBuilder::new()
            .build()
            .await
            .expect("Failed to build test database");

        let csv = format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}",
            HEADER,
            "S1,F1,R1,REG-1,s1@x.com,1,CS,1",
            "S2,F2,R2,REG-2,s2@x.com,2,CS,1",
            "S3,F3,R3,REG-3,s3@x.com,3,CS,1",
            "S4,F4,R4,REG-4,s4@x.com,4,CS,1",
            "S5,F5,R5,REG-5,s5@x.com,5,CS,1",
            "Dupe,F6,R6,REG-6,s3@x.com,6,CS,1"
        );

        let report = import_students_from_csv(&test_db.pool, csv.as_bytes())
            .await
            .expect("Import should succeed");

        assert_eq!(report.inserted, 5);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 6);

        // The valid rows are committed despite the failure.
        for email in ["s1@x.com", "s2@x.com", "s3@x.com", "s4@x.com", "s5@x.com"] {
            let student = get_student_by_email(&test_db.pool, email)
                .await
                .expect("Lookup should succeed");
            assert!(student.is_some(), "{} should have been imported", email);
        }

        let dupe = get_student_by_email(&test_db.pool, "s3@x.com")
            .await
            .expect("Lookup should succeed")
            .expect("Student should exist");
        assert_eq!(dupe.name, "S3", "The duplicate row must not overwrite");
    }

    #[tokio::test]
    async fn test_import_isolates_missing_email_and_malformed_rows() {
        let test_db = TestDbBuilder::new()
            .student_record(student_fields("Existing", "existing@x.com"))
            .build()
            .await
            .expect("Failed to build test database");

        let csv = format!(
            "{}\n{}\n{}\n{}\n{}",
            HEADER,
            "NoEmail,F1,R1,REG-1,,1,CS,1",
            "broken,row",
            "Fresh,F2,R2,REG-2,fresh@x.com,2,CS,1",
            "Clash,F3,R3,REG-3,existing@x.com,3,CS,1"
        );

        let report = import_students_from_csv(&test_db.pool, csv.as_bytes())
            .await
            .expect("Import should succeed");

        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 3);

        let failed_rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(failed_rows, vec![1, 2, 4]);

        let fresh = get_student_by_email(&test_db.pool, "fresh@x.com")
            .await
            .expect("Lookup should succeed");
        assert!(fresh.is_some());
    }

    #[tokio::test]
    async fn test_import_header_only_file_is_empty_report() {
        let test_db = TestDbBuilder::new()
            .build()
            .await
            .expect("Failed to build test database");

        let rows = parse_student_rows(HEADER.as_bytes()).expect("Parsing should succeed");
        assert!(rows.is_empty());

        let report = import_students(&test_db.pool, rows)
            .await
            .expect("Import should succeed");

        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed, 0);
        assert!(report.errors.is_empty());
    }
}
