/// SW3D Terminal Demo
///
/// Usage: sw3d-terminal [model.obj]
///
/// Renders the given OBJ model, or a cube when no path is given.
/// Controls:
///   - Left drag: orbit   Scroll or +/-: zoom   Right click: pick
///   - WASD / Arrow Keys, E/C: move the camera
///   - 1-8: toggle render settings   T: switch triangulator
///   - Space: pause spin   R: reset   Q/ESC: Quit
use std::env;
use std::io;
use sw3d_core::Mesh;
use sw3d_terminal::{load_obj, TerminalApp};

fn main() -> io::Result<()> {
    println!("SW3D Terminal Renderer - Loading...");

    let mesh = match env::args().nth(1) {
        Some(path) => {
            println!("Loading OBJ file: {}", path);
            let mesh = load_obj(&path)?;
            println!(
                "Loaded {} vertices, {} polygons",
                mesh.vertices.len(),
                mesh.polygons.len()
            );
            mesh
        }
        None => Mesh::cube(2.0),
    };

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    // Run the terminal app
    let mut app = TerminalApp::new(mesh)?;
    app.run()?;

    println!("Thank you for using SW3D Terminal Renderer!");
    Ok(())
}
