use super::*;

#[test]
fn parses_hex_forms() {
    assert_eq!(parse_color("#ff0000").unwrap(), Rgba8::rgb(255, 0, 0));
    assert_eq!(parse_color("#FFF").unwrap(), Rgba8::rgb(255, 255, 255));
    assert_eq!(
        parse_color("#0000ff80").unwrap(),
        Rgba8 {
            r: 0,
            g: 0,
            b: 255,
            a: 128
        }
    );
}

#[test]
fn parses_names_case_insensitively() {
    assert_eq!(parse_color("white").unwrap(), Rgba8::rgb(255, 255, 255));
    assert_eq!(parse_color(" Black ").unwrap(), Rgba8::rgb(0, 0, 0));
}

#[test]
fn parses_rgb_functions() {
    assert_eq!(parse_color("rgb(10, 20, 30)").unwrap(), Rgba8::rgb(10, 20, 30));
    let c = parse_color("rgba(0,0,0,0.5)").unwrap();
    assert_eq!(c.a, 128);
}

#[test]
fn rejects_garbage() {
    assert!(parse_color("").is_err());
    assert!(parse_color("#12345").is_err());
    assert!(parse_color("#gggggg").is_err());
    assert!(parse_color("not-a-color").is_err());
    assert!(parse_color("rgb(1,2)").is_err());
}

#[test]
fn ffmpeg_form() {
    assert_eq!(Rgba8::rgb(255, 0, 16).to_ffmpeg(), "0xFF0010");
    let half = Rgba8 {
        r: 0,
        g: 0,
        b: 0,
        a: 128,
    };
    assert_eq!(half.to_ffmpeg(), "0x000000@0.502");
}
