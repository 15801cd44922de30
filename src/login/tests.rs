use super::*;
use crate::db::Database;

const TEST_COST: u32 = 4;

fn form(old: &str, new: &str, confirm: &str) -> ChangePasswordForm {
    ChangePasswordForm {
        old_password: old.to_string(),
        new_password: new.to_string(),
        confirm_password: confirm.to_string(),
    }
}

#[test]
fn test_new_password_rules() {
    assert_eq!(
        form("x", "short", "short").validate_new_password(),
        Err(PasswordChangeProblem::TooShort)
    );
    assert_eq!(
        form("x", "longenough", "different").validate_new_password(),
        Err(PasswordChangeProblem::Mismatch)
    );
    assert_eq!(form("x", "sixsix", "sixsix").validate_new_password(), Ok(()));
    // Length counts characters, not bytes
    assert_eq!(
        form("x", "ääääää", "ääääää").validate_new_password(),
        Ok(())
    );
}

#[test]
fn test_seed_only_once() {
    let db = Database::open_in_memory().unwrap();
    assert!(seed_admin_password(&db, "admin", TEST_COST).unwrap());
    assert!(!seed_admin_password(&db, "other", TEST_COST).unwrap());

    let hash = db.admin_password_hash().unwrap().unwrap();
    assert!(bcrypt::verify("admin", &hash).unwrap());
}

#[tokio::test]
async fn test_verify_and_replace_password() {
    let db = Database::open_in_memory().unwrap();
    seed_admin_password(&db, "admin", TEST_COST).unwrap();

    assert!(verify_admin_password(&db, "admin".to_string()).await.unwrap());
    assert!(!verify_admin_password(&db, "nope".to_string()).await.unwrap());

    set_admin_password(&db, "new-secret".to_string(), TEST_COST)
        .await
        .unwrap();
    assert!(!verify_admin_password(&db, "admin".to_string()).await.unwrap());
    assert!(verify_admin_password(&db, "new-secret".to_string()).await.unwrap());
}

#[tokio::test]
async fn test_verify_without_credential() {
    let db = Database::open_in_memory().unwrap();
    assert!(matches!(
        verify_admin_password(&db, "admin".to_string()).await,
        Err(LoginError::CredentialMissing)
    ));
}
