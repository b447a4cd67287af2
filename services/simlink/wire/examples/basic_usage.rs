//! Basic usage example for the simlink wire codec.

use bytes::BytesMut;
use simlink_wire::{decode, ContentKind, Node, StreamDecoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simlink Wire Codec Example ===\n");

    // 1. Build a message tree
    println!("1. Building a HELLO-shaped tree...");
    let hello = Node::new(0x0001).with_child(
        Node::new(0x0001)
            .with_child(Node::leaf(0x0001, ContentKind::Word, 2u16))
            .with_child(Node::leaf(0x0002, ContentKind::Word, 2u16))
            .with_child(Node::leaf(0x0003, ContentKind::String, "Example desk"))
            .with_child(Node::leaf(0x0004, ContentKind::String, "1.0")),
    );

    let bytes = hello.encode()?;
    println!("   Encoded size: {} bytes", bytes.len());
    println!("   Bytes: {:02X?}", &bytes[..]);

    // 2. Decode it in one go
    println!("\n2. Decoding the buffer...");
    let decoded = decode(&bytes)?;
    println!("   Root id: {:?}", decoded.id);
    if let Some(name) = decoded
        .child(0x0001)
        .and_then(|cmd| cmd.child(0x0003))
        .map(|leaf| leaf.read_as(ContentKind::String))
        .transpose()?
        .flatten()
    {
        println!("   Client name: {}", name);
    }

    // 3. Feed the same bytes in small chunks
    println!("\n3. Feeding the decoder 5 bytes at a time...");
    let mut decoder = StreamDecoder::new();
    let mut buf = BytesMut::new();
    for (i, chunk) in bytes.chunks(5).enumerate() {
        buf.extend_from_slice(chunk);
        if let Some(tree) = decoder.decode(&mut buf)? {
            println!("   Complete after chunk {} ({} nodes)", i + 1, tree.subtree_len());
        }
    }

    // 4. Range checks
    println!("\n4. Encoding an out-of-range value...");
    match Node::leaf(1, ContentKind::Byte, 256i32).encode() {
        Ok(_) => println!("   unexpectedly accepted"),
        Err(e) => println!("   rejected: {}", e),
    }

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
