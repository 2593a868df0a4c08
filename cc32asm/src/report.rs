/// Formats one section's accumulated hex digits as the object
/// report's code block: a `#name` header, then space-separated byte
/// pairs, eight to a line.
pub fn format_code_block(section: &str, code: &str) -> String {
    let mut block = format!("\n\n#{}\n", section);
    for (i, pair) in code.as_bytes().chunks(2).enumerate() {
        for &digit in pair {
            block.push(digit as char);
        }
        block.push(' ');
        if (i + 1) % 8 == 0 {
            block.push('\n');
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_pairs_and_wraps_every_eight() {
        assert_eq!(
            format_code_block(".data", "010002000300"),
            "\n\n#.data\n01 00 02 00 03 00 "
        );
        assert_eq!(
            format_code_block(".text", "EF180000EF100000"),
            "\n\n#.text\nEF 18 00 00 EF 10 00 00 \n"
        );
    }

    #[test]
    fn empty_section_is_just_the_header() {
        assert_eq!(format_code_block(".bss", ""), "\n\n#.bss\n");
    }
}
