
/// Contains the aggregate statistics reported by the assembly binary
pub mod assembly_stats;
/// Packed 2-bit k-mer encoding and the de Bruijn adjacency predicate
pub mod kmer;
/// Contains the positional evidence contract consumed by the graph
pub mod kmer_node;
