///! Protobuf messages of the sticker storage service
///!
///! The manifest of a pack is a serialized `Pack` message, encrypted with
///! keys derived from the pack key.

/// Decrypted pack manifest
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pack {
    #[prost(string, optional, tag = "1")]
    pub title: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub author: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "3")]
    pub cover: ::core::option::Option<pack::Sticker>,
    #[prost(message, repeated, tag = "4")]
    pub stickers: ::prost::alloc::vec::Vec<pack::Sticker>,
}

/// Nested message and enum types in `Pack`.
pub mod pack {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Sticker {
        #[prost(uint32, optional, tag = "1")]
        pub id: ::core::option::Option<u32>,
        #[prost(string, optional, tag = "2")]
        pub emoji: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "3")]
        pub content_type: ::core::option::Option<::prost::alloc::string::String>,
    }
}
