// generate_key.rs
// Utility to generate a new cookie secret for the encrypted-cookie token storage

#[allow(dead_code)]
#[path = "services/encryption.rs"]
mod encryption;

use encryption::EncryptionService;

fn main() {
    println!("Generating new cookie secret...\n");

    let secret = EncryptionService::generate_secret();

    println!("✅ Secret generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("TOKEN_STORAGE=cookie");
    println!("COOKIE_SECRET={}", secret);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep this secret out of version control");
    println!("  • Changing it signs the admin out: existing token cookies can no longer be read");
}
