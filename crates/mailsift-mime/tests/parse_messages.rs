//! End-to-end parsing of complete messages.

#![allow(clippy::unwrap_used, clippy::unreadable_literal, missing_docs)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailsift_mime::{
    Address, AddressListEntry, Error, Group, ParserConfig, TextPartPolicy, parse, parse_with,
};

const MULTIPART_COMPLEX: &str = r#"From: Sender <sender@test.com>
To: receiver@test.com
Subject: Multipart complex
MIME-Version: 1.0
Content-Type: multipart/mixed; boundary="outer"

This is a multi-part message in MIME format.
--outer
Content-Type: multipart/alternative; boundary="inner"

--inner
Content-Type: text/plain

This part shouldn't.

--inner
Content-Type: text/html

<html><head>This part should be returned.</head></html>

--inner--

--outer
Content-Type: application/octet-stream
Content-Transfer-Encoding: base64

VGhpcyBpc24ndCByZWFsbHkgYW4gYXBwbGljYXRpb24vb2N0ZXQtc3RyZWFtLiA7KQ==
--outer
Content-Type: text/plain

Neither should this part!

--outer
Content-Type: image/png
Content-Transfer-Encoding: base64

TmVpdGhlciBpcyB0aGlzIGFuIGltYWdlL3BuZy4=
--outer--
"#;

const UTF8_INPUT: &str = r#"Content-Type: multipart/mixed;
    boundary="------------cJMvmFk1NneB7MT4jwYHY7ap"

This is a multi-part message in MIME format.
--------------cJMvmFk1NneB7MT4jwYHY7ap
Content-Type: text/plain; charset=UTF-8;
Content-Transfer-Encoding: 8bit

Import HTML cöntäct//Subjεέςτ//

--------------cJMvmFk1NneB7MT4jwYHY7ap--"#;

const SHIFT_JIS_IMAGE: &str = r#"From: sender@test.com
To: receiver@test.com
Subject: Shift-JIS and PNG test
MIME-Version: 1.0
Content-Type: multipart/mixed; boundary="sjis-boundary"

--sjis-boundary
Content-Type: text/plain; charset="Shift_JIS"
Content-Transfer-Encoding: base64

UG9ydGFibGUgTmV0d29yayBHcmFwaGljc4Fpg3yBW4Neg3WDi4FFg2yDYoNng4+BW4NOgUWDT4OJ
g3SDQoNig06DWIFBUE5HgWqCzYNSg5ODc4OFgVuDXoLFg3KDYoNng32DYoN2ieaRnILwiLWCpIN0
g0CDQ4OLg3SDSIFbg32DYoNngsWCoILpgUKIs49rg0GDi4NTg4qDWYOAgsaCtYLERGVmbGF0ZYLw
jcyXcIK1gsSCooLpgUGIs49rgsmC5oLpieaOv4LMl/KJu4LMgsiCoonCi3SIs49rgsyJ5pGcg3SD
QINDg4uDdINIgVuDfYNig2eCxYKggumBQgo=

--sjis-boundary
Content-Type: image/png
Content-Transfer-Encoding: base64

iVBORw0KGgoAAAANSUhEUgAAAIAAAABECAIAAADGJao+AAAAwklEQVR4Xu3UgQbDMBRA0bc03f//
b7N0VuqJEmwoc+KqNEkDh9b+2HuJu1KNO4f+AQCAAAAQAAACAEAAAAgAAAEAIAAABACAAAAQAAAC
AEAAAAgAAAEAIAAAANReamRLlPWYfNH0klxcPs+cP3NxWF+vi3lb7pa2R+vx6tHOtuN1O+a5lY3H
zgM5ya/GM5N7ZjfPq7/5yS8IgAAAEAAAAgBAAAAIAAABACAAAAQAgAAAEAAAAgBAAAAIAAABACAA
AIw322gDIPvtlmUAAAAASUVORK5CYII=
--sjis-boundary--
"#;

const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAIAAAABECAIAAADGJao+AAAAwklEQVR4Xu3UgQbDMBRA0bc03f//b7N0VuqJEmwoc+KqNEkDh9b+2HuJu1KNO4f+AQCAAAAQAAACAEAAAAgAAAEAIAAABACAAAAQAAACAEAAAAgAAAEAIAAAANReamRLlPWYfNH0klxcPs+cP3NxWF+vi3lb7pa2R+vx6tHOtuN1O+a5lY3HzgM5ya/GM5N7ZjfPq7/5yS8IgAAAEAAAAgBAAAAIAAABACAAAAQAgAAAEAAAAgBAAAAIAAABACAAAIw322gDIPvtlmUAAAAASUVORK5CYII=";

const MULTIPART_BINARY: &str = concat!(
    "From: sender@test.com\r\n",
    "Subject: Binary attachment\r\n",
    "Content-Type: multipart/mixed; boundary=\"bin\"\r\n",
    "\r\n",
    "--bin\r\n",
    "Content-Type: text/plain\r\n",
    "\r\n",
    "See attachment.\r\n",
    "--bin\r\n",
    "Content-Type: application/octect-stream\r\n",
    "Content-Transfer-Encoding: binary\r\n",
    "\r\n",
    "\x01\x02\x03\r\n",
    "--bin--\r\n"
);

const MULTIPART_CONTENT_ID: &str = r#"From: sender@test.com
Subject: Content-ID
Content-Type: multipart/related; boundary="rel"

--rel
Content-Type: text/html; charset=us-ascii

<img src="cid:001110.102211@siebel.com">
--rel
Content-Type: image/png
Content-Transfer-Encoding: base64
Content-ID: <001110.102211@siebel.com>

TmVpdGhlciBpcyB0aGlzIGFuIGltYWdlL3BuZy4=
--rel
Content-Type: image/png
Content-Transfer-Encoding: base64
Content-Disposition: attachment; filename="test.png"

TmVpdGhlciBpcyB0aGlzIGFuIGltYWdlL3BuZy4=
--rel--
"#;

const MULTIPART_EMPTY_ATTACHMENT: &str = r#"From: MAILER-DAEMON@test.com
Subject: Undelivered Mail
Content-Type: multipart/report; report-type=delivery-status; boundary="report"

--report
Content-Type: text/plain

Delivery failed.

--report
Content-Type: text/rfc822-headers

--report--
"#;

const EMPTY_MESSAGE: &str = r#"Content-Type: multipart/mixed; boundary="------------P7E1gxp6rCvfn0to5n3PZ2h0";
    protected-headers="v1"
From: Sender <sender@test.com>
To: receiver@test.com
Message-ID: <39b3134c-0fcd-4618-b1bd-2b20481bf2af>
Subject: Empty message test

--------------P7E1gxp6rCvfn0to5n3PZ2h0
Content-Type: text/plain; charset=UTF-8; format=flowed
Content-Transfer-Encoding: 7bit


--------------P7E1gxp6rCvfn0to5n3PZ2h0--"#;

const ENCODED_SUBJECT: &str = concat!(
    "From: Sender <sender@test.com>\r\n",
    "Subject: =?UTF-8?B?c3ViamVjdCB3aXRoIGVtb2ppcyDw?=\r\n",
    " =?UTF-8?B?n5iD8J+Yhw==?=\r\n",
    "Content-Type: multipart/mixed; boundary=\"enc\"; protected-headers=\"v1\"\r\n",
    "\r\n",
    "--enc\r\n",
    "Content-Type: text/plain; charset=UTF-8\r\n",
    "Content-Transfer-Encoding: quoted-printable\r\n",
    "\r\n",
    "test utf8 in encrypted =\r\n",
    "subject\r\n",
    "\r\n",
    "--enc--\r\n"
);

const MULTIPART_ADDRESSES: &str = r#"From: Some One <someone@test.com>
To: receiver@test.com, another_receiver@test.com
Cc: copy@test.com
Date: Sun, 12 Jun 2022 17:21:02 +0200
Subject: Addresses
Content-Type: multipart/alternative; boundary="addr"

--addr
Content-Type: text/plain

Addresses
--addr--
"#;

const MULTIPART_ADDRESS_GROUPS: &str = r#"From: Some One <someone@test.com>
To: undisclosed-recipients:;
Cc: Group A: AA <a@b.com>, AB <a@b.com>; Group B: <b@b.com>;
Subject: Groups
Content-Type: multipart/alternative; boundary="groups"

--groups
Content-Type: text/plain

Groups
--groups--
"#;

fn address(name: &str, email: &str) -> AddressListEntry {
    AddressListEntry::Address(Address::new(name, email))
}

#[test]
fn parses_multipart_with_html_and_plain_text() {
    let message = parse(MULTIPART_COMPLEX).unwrap();

    assert_eq!(
        message.body.html.as_deref(),
        Some("<html><head>This part should be returned.</head></html>\n")
    );
    assert_eq!(message.body.text, "This part shouldn't.\n\nNeither should this part!\n");

    assert_eq!(message.attachments.len(), 2);
    let octet = &message.attachments[0];
    assert_eq!(
        STANDARD.encode(&octet.content),
        "VGhpcyBpc24ndCByZWFsbHkgYW4gYXBwbGljYXRpb24vb2N0ZXQtc3RyZWFtLiA7KQ=="
    );
    assert_eq!(octet.content_type, "application/octet-stream");
    assert_eq!(octet.file_name, "");
    assert_eq!(octet.content_id, None);

    let png = &message.attachments[1];
    assert_eq!(png.content_type, "image/png");
    assert_eq!(STANDARD.encode(&png.content), "TmVpdGhlciBpcyB0aGlzIGFuIGltYWdlL3BuZy4=");
    assert_eq!(png.file_name, "");
}

#[test]
fn first_text_policy_keeps_first_plain_part() {
    let config = ParserConfig::builder().text_parts(TextPartPolicy::First).build();
    let message = parse_with(MULTIPART_COMPLEX, &config).unwrap();
    assert_eq!(message.body.text, "This part shouldn't.\n");
}

#[test]
fn crlf_and_lf_line_endings_agree() {
    let lf = parse(MULTIPART_COMPLEX).unwrap();
    let crlf = parse(MULTIPART_COMPLEX.replace('\n', "\r\n")).unwrap();

    assert_eq!(crlf.subject, lf.subject);
    assert_eq!(crlf.attachments, lf.attachments);
    assert_eq!(crlf.body.text, "This part shouldn't.\r\n\r\nNeither should this part!\r\n");
}

#[test]
fn parses_utf8_string_input() {
    let message = parse(UTF8_INPUT).unwrap();
    assert_eq!(message.body.text, "Import HTML cöntäct//Subjεέςτ//\n");
    assert!(message.attachments.is_empty());
}

#[test]
fn parses_shift_jis_body_with_png_attachment() {
    let message = parse(SHIFT_JIS_IMAGE).unwrap();

    assert_eq!(
        message.body.text,
        "Portable Network Graphics（ポータブル・ネットワーク・グラフィックス、PNG）はコンピュータでビットマップ画像を扱うファイルフォーマットである。圧縮アルゴリズムとしてDeflateを採用している、圧縮による画質の劣化のない可逆圧縮の画像ファイルフォーマットである。\n"
    );
    assert_eq!(message.subject, "Shift-JIS and PNG test");
    assert_eq!(message.headers.get_all("subject"), vec!["Shift-JIS and PNG test"]);

    let [attachment] = message.attachments.as_slice() else {
        panic!("expected one attachment, got {}", message.attachments.len());
    };
    assert_eq!(STANDARD.encode(&attachment.content), PNG_BASE64);
    assert_eq!(attachment.size, 251);
    assert_eq!(attachment.content_type, "image/png");
    assert_eq!(attachment.file_name, "");
}

#[test]
fn reads_binary_attachments() {
    let message = parse(MULTIPART_BINARY).unwrap();
    let attachment = &message.attachments[0];

    assert_eq!(attachment.content, vec![1, 2, 3]);
    assert_eq!(attachment.content_type, "application/octect-stream");
    assert_eq!(attachment.file_name, "");
    assert_eq!(message.body.text, "See attachment.");
}

#[test]
fn includes_content_id_and_file_name() {
    let message = parse(MULTIPART_CONTENT_ID).unwrap();
    let [first, second] = message.attachments.as_slice() else {
        panic!("expected two attachments, got {}", message.attachments.len());
    };

    assert_eq!(first.content, second.content);
    assert_eq!(first.content_id.as_deref(), Some("<001110.102211@siebel.com>"));
    assert_eq!(first.content_type, "image/png");
    assert_eq!(first.file_name, "");
    assert_eq!(second.content_type, "image/png");
    assert_eq!(second.file_name, "test.png");
    assert_eq!(second.content_id, None);

    assert_eq!(
        message.body.html.as_deref(),
        Some("<img src=\"cid:001110.102211@siebel.com\">")
    );
}

#[test]
fn empty_attachment_body_is_empty_content() {
    let message = parse(MULTIPART_EMPTY_ATTACHMENT).unwrap();
    let attachment = &message.attachments[0];

    assert!(attachment.content.is_empty());
    assert_eq!(attachment.size, 0);
    assert_eq!(attachment.content_type, "text/rfc822-headers");
    assert_eq!(attachment.file_name, "");
    assert_eq!(message.body.text, "Delivery failed.\n");
}

#[test]
fn missing_html_body_is_none() {
    let message = parse(EMPTY_MESSAGE).unwrap();

    assert_eq!(message.subject, "Empty message test");
    assert_eq!(message.body.text, "");
    assert_eq!(message.body.html, None);
    assert_eq!(
        message.message_id.as_deref(),
        Some("<39b3134c-0fcd-4618-b1bd-2b20481bf2af>")
    );
    assert_eq!(message.from, Some(Address::new("Sender", "sender@test.com")));
}

#[test]
fn decodes_the_subject() {
    let message = parse(ENCODED_SUBJECT).unwrap();
    assert_eq!(message.subject, "subject with emojis 😃😇");
    assert_eq!(message.body.text, "test utf8 in encrypted subject\r\n");
}

#[test]
fn parses_addresses_and_date() {
    let message = parse(MULTIPART_ADDRESSES).unwrap();

    assert_eq!(message.from, Some(Address::new("Some One", "someone@test.com")));
    assert_eq!(
        message.to,
        Some(vec![
            address("", "receiver@test.com"),
            address("", "another_receiver@test.com")
        ])
    );
    assert_eq!(message.cc, Some(vec![address("", "copy@test.com")]));
    assert_eq!(message.bcc, None);
    assert_eq!(message.reply_to, None);

    let date = message.date.unwrap();
    assert_eq!(date.timestamp(), 1_655_047_262);
    assert_eq!(date.to_rfc2822(), "Sun, 12 Jun 2022 17:21:02 +0200");
}

#[test]
fn parses_address_groups() {
    let message = parse(MULTIPART_ADDRESS_GROUPS).unwrap();

    assert_eq!(message.from, Some(Address::new("Some One", "someone@test.com")));
    assert_eq!(
        message.to,
        Some(vec![AddressListEntry::Group(Group {
            name: "undisclosed-recipients".to_string(),
            members: Vec::new(),
        })])
    );
    assert_eq!(
        message.cc,
        Some(vec![
            AddressListEntry::Group(Group {
                name: "Group A".to_string(),
                members: vec![Address::new("AA", "a@b.com"), Address::new("AB", "a@b.com")],
            }),
            AddressListEntry::Group(Group {
                name: "Group B".to_string(),
                members: vec![Address::new("", "b@b.com")],
            }),
        ])
    );
    assert_eq!(message.bcc, None);
}

#[test]
fn headers_keep_order_and_duplicates() {
    let raw = "Received: from a\nReceived: from b\nX-Custom: one\nx-custom: two\n\nbody";
    let message = parse(raw).unwrap();

    assert_eq!(
        message.headers.grouped(),
        vec![
            ("received", vec!["from a", "from b"]),
            ("x-custom", vec!["one", "two"]),
        ]
    );
}

#[test]
fn deep_nesting_becomes_opaque_leaf() {
    let depth = 200;
    let mut raw = String::from("Subject: deep\n");
    for level in 0..depth {
        raw.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"b{level}\"\n\n--b{level}\n"
        ));
    }
    raw.push_str("Content-Type: text/plain\n\ninnermost\n");
    for level in (0..depth).rev() {
        raw.push_str(&format!("--b{level}--\n"));
    }

    let message = parse(&raw).unwrap();
    assert_eq!(message.body.text, "");
    let [opaque] = message.attachments.as_slice() else {
        panic!("expected one opaque leaf, got {}", message.attachments.len());
    };
    assert_eq!(opaque.content_type, "multipart/mixed");

    let config = ParserConfig::builder().max_depth(depth + 1).build();
    let message = parse_with(&raw, &config).unwrap();
    assert_eq!(message.body.text, "innermost");
    assert!(message.attachments.is_empty());
}

#[test]
fn rejects_input_that_is_not_a_message() {
    assert!(matches!(parse(""), Err(Error::Empty)));
    assert!(matches!(parse("\n\n\n"), Err(Error::Empty)));
    assert!(matches!(parse("just some text without a colon"), Err(Error::NotAMessage)));
}

#[test]
fn malformed_parts_do_not_abort() {
    let raw = concat!(
        "Subject: broken\n",
        "Date: not a date\n",
        "Content-Type: multipart/mixed; boundary=x\n",
        "\n",
        "--x\n",
        "Content-Type: garbage\n",
        "Content-Transfer-Encoding: base64\n",
        "\n",
        "!!QUJD*\n",
        "--x\n",
        "Content-Type: text/plain; charset=x-unknown\n",
        "\n",
        "still here"
    );
    let message = parse(raw).unwrap();

    assert_eq!(message.date, None);
    assert_eq!(message.headers.get("date"), Some("not a date"));
    // Unparseable content types fall back to text/plain
    assert_eq!(message.body.text, "ABC\nstill here");
    assert!(message.attachments.is_empty());
}
