//! Decoding a mixed stream of gateway payloads the way the connection does.

use danmu_core::{ChatEvent, decode_frame};

const STREAM: &[&str] = &[
    r#"{"platform":"bilibili","roomId":"7","type":"ENTER_ROOM","msg":{"username":"v1"}}"#,
    r#"{"platform":"bilibili","roomId":"7","type":"DANMU","msg":{"badgeName":"","badgeLevel":0,"content":" first ","username":"v1","userAvatar":"","uid":"123"}}"#,
    r#"{"platform":"bilibili","roomId":"7","type":"GIFT","msg":{"giftName":"rocket","count":1}}"#,
    r#"not json at all"#,
    r#"{"platform":"bilibili","roomId":"7","type":"DANMU","msg":{"content":"missing fields"}}"#,
    r#"{"platform":"douyin","roomId":"8","type":"DANMU","msg":{"badgeName":"fans","badgeLevel":12,"content":"second","username":"v2","userAvatar":"https://a.invalid/x.png"}}"#,
    r#"{"platform":"bilibili","roomId":7,"type":"DANMU","msg":{"badgeName":null,"badgeLevel":null,"content":"no badge","username":"v3","userAvatar":null}}"#,
];

#[test]
fn forwards_only_valid_danmu_in_order() {
    let forwarded: Vec<ChatEvent> = STREAM
        .iter()
        .filter_map(|payload| decode_frame(payload.as_bytes()).ok().flatten())
        .collect();

    let lines: Vec<String> = forwarded.iter().map(ChatEvent::display_line).collect();
    assert_eq!(lines, ["v1:  first ", "v2: second", "v3: no badge"]);
    assert_eq!(forwarded[0].speech_text(), "first");
    assert_eq!(forwarded[1].platform, "douyin");
    assert_eq!(forwarded[1].message.badge_level, 12);
    assert_eq!(forwarded[2].room_id, "7");
}

#[test]
fn errors_are_scoped_to_their_frame() {
    assert!(decode_frame(STREAM[3].as_bytes()).is_err());
    assert!(decode_frame(STREAM[4].as_bytes()).is_err());
    assert!(decode_frame(STREAM[0].as_bytes()).unwrap().is_none());
}
