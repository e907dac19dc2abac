use std::fs::{self, File};
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::Path;
use std::str::FromStr;
use log::warn;
use crate::hypergraph::Hypergraph;

fn invalid_data(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidData, message.into())
}

fn parse_field<T: FromStr>(field: &str, line_no: usize) -> std::io::Result<T> {
    field
        .parse()
        .map_err(|_| invalid_data(format!("line {}: cannot parse {:?}", line_no, field)))
}

/// Read an hMETIS hypergraph file and output Hypergraph struct.
///
/// The header is `num_hyperedges num_vertices [fmt]`. With `fmt` 1 or 11 every hyperedge
/// line starts with the hyperedge weight, with `fmt` 10 or 11 the hyperedges are followed
/// by one weight line per vertex. Missing weights default to 1. Vertex ids are 1-based.
pub fn read_hmetis_as_hypergraph(file_path: &Path) -> std::io::Result<Hypergraph> {
    let content = fs::read_to_string(file_path)?;

    // Comment lines are dropped, line numbers are kept for error messages.
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('%'));

    let (header_line_no, header) = lines.next().ok_or_else(|| invalid_data("missing header"))?;
    let header: Vec<&str> = header.split_whitespace().collect();
    if header.len() < 2 || header.len() > 3 {
        return Err(invalid_data(format!("line {}: malformed header", header_line_no)));
    }
    let num_hyperedges: usize = parse_field(header[0], header_line_no)?;
    let num_vertices: usize = parse_field(header[1], header_line_no)?;
    let fmt: u32 = match header.get(2) {
        Some(field) => parse_field(field, header_line_no)?,
        None => 0,
    };
    let (has_hyperedge_weights, has_vertex_weights) = match fmt {
        0 => (false, false),
        1 => (true, false),
        10 => (false, true),
        11 => (true, true),
        _ => return Err(invalid_data(format!("line {}: unknown format {}", header_line_no, fmt))),
    };

    let mut hyperedges = Vec::with_capacity(num_hyperedges);
    let mut hyperedge_weights = Vec::with_capacity(num_hyperedges);
    for hyperedge in 0..num_hyperedges {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| invalid_data(format!("expected {} hyperedges, found {}", num_hyperedges, hyperedge)))?;
        let mut fields = line.split_whitespace();

        let weight: f64 = if has_hyperedge_weights {
            match fields.next() {
                Some(field) => parse_field(field, line_no)?,
                None => return Err(invalid_data(format!("line {}: missing hyperedge weight", line_no))),
            }
        } else {
            1.0
        };

        let mut vertices = Vec::new();
        for field in fields {
            let vertex: usize = parse_field(field, line_no)?;
            if vertex == 0 || vertex > num_vertices {
                return Err(invalid_data(format!("line {}: vertex {} out of range", line_no, vertex)));
            }
            vertices.push(vertex - 1);
        }
        vertices.sort_unstable();
        vertices.dedup();

        if vertices.len() < 2 {
            warn!("line {}: dropping hyperedge with {} distinct vertices", line_no, vertices.len());
            continue;
        }
        hyperedges.push(vertices);
        hyperedge_weights.push(vec![weight]);
    }

    let vertex_weights = if has_vertex_weights {
        let mut vertex_weights = Vec::with_capacity(num_vertices);
        for vertex in 0..num_vertices {
            let (line_no, line) = lines
                .next()
                .ok_or_else(|| invalid_data(format!("expected {} vertex weights, found {}", num_vertices, vertex)))?;
            let weight: f64 = parse_field(line, line_no)?;
            vertex_weights.push(vec![weight]);
        }
        vertex_weights
    } else {
        vec![vec![1.0]; num_vertices]
    };

    Hypergraph::new(vertex_weights, &hyperedges, hyperedge_weights)
        .map_err(|e| invalid_data(e.to_string()))
}

/// Read a partition file holding the block of every vertex, one per line.
pub fn read_partition_file(file_path: &Path) -> std::io::Result<Vec<usize>> {
    let content = fs::read_to_string(file_path)?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_field(line.trim(), index + 1))
        .collect()
}

/// Write the partition array to a file, the block of every vertex on its own line.
pub fn write_partition_data_to_file(partition: &[usize], file_name: &str) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(file_name)?);
    for block in partition {
        writeln!(file, "{}", block)?;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{ErrorKind, Write};
    use std::path::Path;
    use itertools::assert_equal;
    use tempfile::tempdir;
    use crate::io::{read_hmetis_as_hypergraph, read_partition_file, write_partition_data_to_file};

    fn create_mock_file(dir: &Path, filename: &str, content: &str) -> String {
        let file_path = dir.join(filename);
        let mut file = File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_read_hmetis_unweighted() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let content = "% unweighted\n3 4\n1 2\n2 3 4\n% trailing comment\n4 1\n";
        let file_path = create_mock_file(temp_dir.path(), "unweighted.hgr", content);

        // Act
        let hgraph = read_hmetis_as_hypergraph(Path::new(&file_path))?;

        // Assert
        assert_eq!(hgraph.num_vertices(), 4);
        assert_eq!(hgraph.num_hyperedges(), 3);
        assert_equal(hgraph.vertices(1).iter().copied(), [1, 2, 3]);
        assert_equal(hgraph.vertices(2).iter().copied(), [0, 3]);
        assert_eq!(hgraph.hyperedge_weights[0], vec![1.0]);

        Ok(())
    }

    #[test]
    fn test_read_hmetis_weighted() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let content = "2 3 11\n5 1 2\n2 2 3\n4\n1\n2\n";
        let file_path = create_mock_file(temp_dir.path(), "weighted.hgr", content);

        // Act
        let hgraph = read_hmetis_as_hypergraph(Path::new(&file_path))?;

        // Assert
        assert_eq!(hgraph.hyperedge_weights, vec![vec![5.0], vec![2.0]]);
        assert_eq!(hgraph.vertex_weights, vec![vec![4.0], vec![1.0], vec![2.0]]);
        assert_equal(hgraph.vertices(0).iter().copied(), [0, 1]);

        Ok(())
    }

    #[test]
    fn test_read_hmetis_drops_single_vertex_hyperedge() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let content = "3 3\n1 1\n1 2\n2 3\n";
        let file_path = create_mock_file(temp_dir.path(), "single.hgr", content);

        // Act
        let hgraph = read_hmetis_as_hypergraph(Path::new(&file_path))?;

        // Assert
        assert_eq!(hgraph.num_hyperedges(), 2);
        assert_equal(hgraph.vertices(0).iter().copied(), [0, 1]);

        Ok(())
    }

    #[test]
    fn test_read_hmetis_vertex_out_of_range() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let content = "1 2\n1 3\n";
        let file_path = create_mock_file(temp_dir.path(), "out_of_range.hgr", content);

        // Act
        let result = read_hmetis_as_hypergraph(Path::new(&file_path));

        // Assert
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);

        Ok(())
    }

    #[test]
    fn test_read_hmetis_missing_hyperedges() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let content = "3 4\n1 2\n";
        let file_path = create_mock_file(temp_dir.path(), "truncated.hgr", content);

        // Act
        let result = read_hmetis_as_hypergraph(Path::new(&file_path));

        // Assert
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);

        Ok(())
    }

    #[test]
    fn test_partition_file_round_trip() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let file_path = temp_dir.path().join("partition.txt");
        let file_name = file_path.to_str().unwrap();

        // Act
        write_partition_data_to_file(&[0, 2, 1, 1], file_name)?;
        let partition = read_partition_file(&file_path)?;

        // Assert
        assert_eq!(partition, vec![0, 2, 1, 1]);

        Ok(())
    }

    #[test]
    fn test_read_partition_file_rejects_garbage() -> Result<(), std::io::Error> {
        // Arrange
        let temp_dir = tempdir()?;
        let file_path = create_mock_file(temp_dir.path(), "partition.txt", "0\n1\nx\n");

        // Act
        let result = read_partition_file(Path::new(&file_path));

        // Assert
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);

        Ok(())
    }
}
