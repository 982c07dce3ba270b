use colored::Colorize;

use stockpile_auth::UserProfile;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_profile(profile: &UserProfile) {
    println!("{}: {}", "User".cyan(), profile.username);
    if !profile.nickname.is_empty() {
        println!("{}: {}", "Nickname".cyan(), profile.nickname);
    }
    if !profile.roles.is_empty() {
        println!("{}: {}", "Roles".cyan(), profile.roles.join(", "));
    }
    if !profile.permissions.is_empty() {
        println!(
            "{}: {}",
            "Permissions".cyan(),
            profile.permissions.join(", ")
        );
    }
}
