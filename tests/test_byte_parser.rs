use reticulate::parser::byte_parser::ByteParser;
use reticulate::parser::parsing_error::ParsingErrorType;

#[test]
fn test_skip_whitespace() {
    let mut parser = ByteParser::from_str(" \r  \t\n \t x y");
    parser.skip_whitespace();
    assert_eq!(parser.peek(), Some(b'x'));

    parser.next_byte(); // skip x
    parser.skip_whitespace();
    assert_eq!(parser.peek(), Some(b'y'));
}

#[test]
fn test_skip_comment() {
    let mut parser = ByteParser::from_str("[Hybrid zone of the stilts] ((A:1,B:1):1,C:2)");
    assert!(parser.skip_comment().unwrap());
    assert_eq!(parser.next_byte(), Some(b' '));
    assert_eq!(parser.next_byte(), Some(b'('));
    assert!(!parser.skip_comment().unwrap());
}

#[test]
fn test_skip_comment_and_whitespace() {
    let mut parser = ByteParser::from_str("[Go] \n[Keep going]   \t ['...']\n[One more to go]  END!");
    parser
        .skip_comment_and_whitespace()
        .expect("Failed to skip comments.");
    assert_eq!(parser.next_byte(), Some(b'E'));
}

#[test]
fn test_unclosed_comment() {
    let mut parser = ByteParser::from_str("  [never closed (A:1,B:1);");
    let error = parser.skip_comment_and_whitespace().unwrap_err();
    assert_eq!(error.kind(), &ParsingErrorType::UnclosedComment);
}

#[test]
fn test_consume_until() {
    let mut parser = ByteParser::from_str("consume a CAN of beans");
    assert!(parser.consume_until(b'C'));
    assert_eq!(parser.peek(), Some(b'A'));
    assert_eq!(parser.position(), 11);

    assert!(!parser.consume_until(b'X'));
    assert!(parser.is_eof());
}

#[test]
fn test_consume_if_is_case_insensitive() {
    let mut parser = ByteParser::from_str("[&Gamma=0.3]");
    assert!(!parser.consume_if_sequence(b"[&gammas"));
    assert!(parser.peek_is_sequence(b"[&gamma"));
    assert!(parser.consume_if_sequence(b"[&gamma"));
    assert!(parser.peek_is(b'='));
    assert!(parser.consume_if(b'='));
    assert!(!parser.consume_if(b']'));
}

#[test]
fn test_context_for_errors() {
    let mut parser = ByteParser::from_str("(A:1,B:1);");
    parser.next_byte();
    assert_eq!(parser.get_context_as_string(3), "A:1");
    assert_eq!(parser.get_context_as_string(100), "A:1,B:1);");
    assert_eq!(parser.position(), 1);
}

#[test]
fn test_parse_labels() {
    let mut parser = ByteParser::from_str("Kea:1, 'Rock wren':2,'Wilson''s storm-petrel'");
    assert_eq!(parser.parse_label(b":,").unwrap(), "Kea");
    assert!(parser.consume_until(b','));
    assert_eq!(parser.parse_label(b":,").unwrap(), "Rock wren");
    assert!(parser.consume_until(b','));
    assert_eq!(parser.parse_label(b":,").unwrap(), "Wilson's storm-petrel");
    assert!(parser.is_eof());
}

#[test]
fn test_unclosed_quoted_label() {
    let mut parser = ByteParser::from_str("'Takahe:1");
    let error = parser.parse_label(b":").unwrap_err();
    assert_eq!(error.kind(), &ParsingErrorType::UnclosedQuote);
}
