#[cfg(test)]
mod tests {
    use crate::uploads::{PhotoStore, sanitize_file_name};
    use rocket::tokio;
    use uuid::Uuid;

    fn temp_store() -> PhotoStore {
        PhotoStore::new(
            std::env::temp_dir().join(format!("student-registry-uploads-{}", Uuid::new_v4())),
        )
    }

    #[test]
    fn test_sanitize_strips_directory_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("/var/tmp/photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("C:\\Users\\x\\photo.png"), "photo.png");
    }

    #[test]
    fn test_sanitize_collapses_unsafe_characters() {
        assert_eq!(sanitize_file_name("photo 1 (2).jpg"), "photo_1_2_.jpg");
        assert_eq!(sanitize_file_name("semester#1;report.pdf"), "semester_1_report.pdf");
        assert_eq!(sanitize_file_name("plain-name_0.9.jpg"), "plain-name_0.9.jpg");
    }

    #[test]
    fn test_sanitize_refuses_hidden_and_empty_names() {
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("..."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("///"), "upload");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_file_name(&long).len(), 120);
    }

    #[tokio::test]
    async fn test_save_writes_file_and_returns_reference() {
        let store = temp_store();

        let stored = store
            .save("bob.jpg", b"jpeg bytes")
            .await
            .expect("Save should succeed");

        assert_eq!(stored, "bob.jpg");

        let contents = tokio::fs::read(store.path_for(&stored))
            .await
            .expect("Stored file should be readable");
        assert_eq!(contents, b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_save_confines_traversal_names_to_the_root() {
        let store = temp_store();

        let stored = store
            .save("../escape.txt", b"nope")
            .await
            .expect("Save should succeed");

        assert_eq!(stored, "escape.txt");
        assert!(store.path_for(&stored).exists());

        let outside = store.root().parent().unwrap().join("escape.txt");
        assert!(!outside.exists(), "File must not land outside the root");
    }
}
