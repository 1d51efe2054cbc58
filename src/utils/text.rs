pub fn help() -> String {
    let commands = [
        // --- compute endpoints ---
        "/compute?dimension=N[&seed=S][&format=html|json][&checksum=true]",
        "/matrix-multiplication/compute?dimension=N",
        "/generate[?rows=N][&seed=S][&format=html|json]",
        "/table-generator/generate[?rows=N]",

        // --- utility endpoints ---
        "/status",
        "/help",
    ];

    let mut output = String::from("Available commands:\n");
    for cmd in commands.iter() {
        output.push_str(&format!(" - {}\n", cmd));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help() {
        let help_text = help();
        assert!(help_text.starts_with("Available commands:"));
        assert!(help_text.contains("/compute?dimension=N"));
        assert!(help_text.contains("/generate"));
        assert!(help_text.contains("/status"));
    }
}
